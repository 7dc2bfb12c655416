//! WebSocket layer: one relay peer per connection.
//!
//! The WebSocket endpoint at `/ws` is the tab-facing side of the relay.
//! Each connection is assigned an identifier and then relays JSON
//! envelopes in both directions.

pub mod connection;
pub mod handler;
