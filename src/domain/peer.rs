//! Relay-side record of one connected tab.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use super::ConnectionId;

/// Sending half of a tab's inbound queue. Carries JSON text frames.
pub type PeerSender = mpsc::Sender<String>;

/// One connected tab as seen by the relay.
///
/// The `channel` is owned by the relay for the lifetime of the connection;
/// nothing outside the relay writes to it.
#[derive(Debug)]
pub struct Peer {
    /// Identifier assigned on connect (immutable).
    pub connection_id: ConnectionId,

    /// Queue of frames destined for this tab.
    pub channel: PeerSender,

    /// Connection timestamp.
    pub connected_at: DateTime<Utc>,
}

impl Peer {
    /// Creates a new `Peer` connected now.
    #[must_use]
    pub fn new(connection_id: ConnectionId, channel: PeerSender) -> Self {
        Self {
            connection_id,
            channel,
            connected_at: Utc::now(),
        }
    }

    /// Returns `true` if the tab side of the queue has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

/// Lightweight view of a peer for the stats endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PeerSummary {
    /// Assigned identifier.
    #[schema(value_type = u64)]
    pub connection_id: ConnectionId,
    /// Connection timestamp.
    pub connected_at: DateTime<Utc>,
    /// Whether the tab has gone away without being pruned.
    pub stale: bool,
}

impl From<&Peer> for PeerSummary {
    fn from(peer: &Peer) -> Self {
        Self {
            connection_id: peer.connection_id,
            connected_at: peer.connected_at,
            stale: peer.is_closed(),
        }
    }
}
