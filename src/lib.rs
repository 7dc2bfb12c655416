//! # tab-relay
//!
//! Same-origin broadcast relay for keeping short-lived values, such as a
//! CSRF token, in sync across many client tabs.
//!
//! One relay process is shared by every tab. Each tab connects once, gets a
//! connection identifier, and publishes typed messages that the relay
//! rebroadcasts to every other tab, never back to the sender.
//!
//! ## Architecture
//!
//! ```text
//! Tabs (ClientAdapter)
//!     │
//!     ├── WsConnector ──── WebSocket /ws ──┐
//!     ├── LocalConnector ── in-process ────┤
//!     │                                    │
//!     │                          WS Handler (ws/)
//!     │                                    │
//!     └──────────────────────────── Relay (domain/)
//!
//! REST (api/): /health, /relay/stats
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
