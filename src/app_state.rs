//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::Relay;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The single relay every tab connects to.
    pub relay: Arc<Relay>,
    /// Capacity of each peer's outbound frame queue.
    pub peer_queue_capacity: usize,
}

impl AppState {
    /// Creates state around `relay`.
    #[must_use]
    pub fn new(relay: Arc<Relay>, peer_queue_capacity: usize) -> Self {
        Self {
            relay,
            peer_queue_capacity: peer_queue_capacity.max(1),
        }
    }
}
