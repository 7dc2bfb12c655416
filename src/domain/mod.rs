//! Domain layer: identifiers, the wire envelope, peers, and the relay.
//!
//! This module contains the relay-side model: connection identity, the
//! JSON envelope every channel carries, the typed-message contract, the
//! per-tab peer record, and the [`Relay`] that rebroadcasts between peers.

pub mod connection_id;
pub mod envelope;
pub mod peer;
pub mod relay;
pub mod typed_message;

pub use connection_id::ConnectionId;
pub use envelope::{CONNECTION, ERROR, Envelope};
pub use peer::{Peer, PeerSender, PeerSummary};
pub use relay::{DisconnectPolicy, Relay, RelaySnapshot};
pub use typed_message::{CsrfToken, TypedMessage};
