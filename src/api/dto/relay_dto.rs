//! DTOs for relay introspection.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{DisconnectPolicy, PeerSummary, RelaySnapshot};

/// Snapshot of the relay's peer registry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RelayStatsResponse {
    /// Number of registered peers, stale ones included.
    pub peer_count: usize,
    /// Most recently assigned identifier, or `null` before the first tab.
    pub last_connection_id: Option<u64>,
    /// Identifiers of registered peers in connection order.
    pub peer_ids: Vec<u64>,
    /// Whether disconnected peers are pruned (`prune`) or kept (`retain`).
    pub disconnect_policy: DisconnectPolicy,
    /// Registered peers in connection order.
    pub peers: Vec<PeerSummary>,
}

impl RelayStatsResponse {
    /// Builds the response body from one registry snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: RelaySnapshot, disconnect_policy: DisconnectPolicy) -> Self {
        Self {
            peer_count: snapshot.peer_count(),
            last_connection_id: snapshot.last_assigned.map(u64::from),
            peer_ids: snapshot.peer_ids().into_iter().map(u64::from).collect(),
            disconnect_policy,
            peers: snapshot.peers,
        }
    }
}
