//! Shared broadcast relay.
//!
//! [`Relay`] keeps the ordered registry of connected [`Peer`]s and the
//! identifier counter. Every inbound envelope is offered to every peer
//! except the one that sent it.
//!
//! The registry is the only shared mutable state. It lives behind a
//! [`tokio::sync::Mutex`] owned by the relay instance, so independent relays
//! (one per test, say) never interfere.

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;

use super::peer::{Peer, PeerSender, PeerSummary};
use super::{ConnectionId, Envelope};
use crate::error::RelayError;

/// What happens to a peer's registry entry once its tab goes away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Remove the peer as soon as its disconnect is observed.
    #[default]
    Prune,
    /// Keep stale peers for the lifetime of the relay.
    Retain,
}

/// Registry contents captured under a single lock.
#[derive(Debug, Clone)]
pub struct RelaySnapshot {
    /// Most recently assigned identifier, if any.
    pub last_assigned: Option<ConnectionId>,
    /// Registered peers in connection order.
    pub peers: Vec<PeerSummary>,
}

impl RelaySnapshot {
    /// Number of registered peers, stale ones included.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Identifiers of registered peers in connection order.
    #[must_use]
    pub fn peer_ids(&self) -> Vec<ConnectionId> {
        self.peers.iter().map(|p| p.connection_id).collect()
    }
}

#[derive(Debug, Default)]
struct RelayState {
    peers: Vec<Peer>,
    counter: u64,
}

/// Single rebroadcast point shared by all tabs.
#[derive(Debug)]
pub struct Relay {
    state: Mutex<RelayState>,
    policy: DisconnectPolicy,
}

impl Relay {
    /// Creates an empty relay with the given disconnect policy.
    #[must_use]
    pub fn new(policy: DisconnectPolicy) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            policy,
        }
    }

    /// Returns the configured disconnect policy.
    #[must_use]
    pub const fn policy(&self) -> DisconnectPolicy {
        self.policy
    }

    /// Registers a new tab and queues its `CONNECTION` assignment.
    ///
    /// Identifiers are `1, 2, 3, ...` in call order and never reused.
    pub async fn on_connect(&self, channel: PeerSender) -> ConnectionId {
        let mut state = self.state.lock().await;
        state.counter += 1;
        let id = ConnectionId::new(state.counter);

        match Envelope::connection(id).to_frame() {
            Ok(frame) => {
                if let Err(e) = channel.try_send(frame) {
                    tracing::warn!(connection_id = %id, error = %e, "could not queue connection assignment");
                }
            }
            Err(e) => {
                tracing::error!(connection_id = %id, error = %e, "failed to encode connection assignment");
            }
        }

        state.peers.push(Peer::new(id, channel));
        tracing::info!(connection_id = %id, peers = state.peers.len(), "peer connected");
        id
    }

    /// Offers `envelope` to every peer except `from`, unmodified.
    ///
    /// Returns the number of peers whose queue accepted the frame. Full
    /// queues are skipped. Closed queues are skipped and, under
    /// [`DisconnectPolicy::Prune`], their peers removed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ReservedType`] if a tab tries to publish a
    /// relay-only tag, or [`RelayError::MalformedMessage`] if the envelope
    /// cannot be encoded.
    pub async fn on_message(
        &self,
        from: ConnectionId,
        envelope: &Envelope,
    ) -> Result<usize, RelayError> {
        if envelope.is_reserved() {
            tracing::warn!(connection_id = %from, msg_type = %envelope.msg_type, "dropping reserved message type from tab");
            return Err(RelayError::ReservedType(envelope.msg_type.clone()));
        }
        let frame = envelope
            .to_frame()
            .map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

        let mut state = self.state.lock().await;
        let mut delivered = 0;
        let mut closed = Vec::new();
        for peer in state.peers.iter().filter(|p| p.connection_id != from) {
            match peer.channel.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %peer.connection_id, "peer queue full, message dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %peer.connection_id, "peer queue closed");
                    closed.push(peer.connection_id);
                }
            }
        }

        if self.policy == DisconnectPolicy::Prune && !closed.is_empty() {
            state.peers.retain(|p| !closed.contains(&p.connection_id));
        }

        tracing::debug!(
            connection_id = %from,
            msg_type = %envelope.msg_type,
            delivered,
            "relayed message"
        );
        Ok(delivered)
    }

    /// Records that a tab went away.
    ///
    /// Returns `true` if a peer was removed from the registry.
    pub async fn on_disconnect(&self, id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        let removed = match self.policy {
            DisconnectPolicy::Prune => {
                let before = state.peers.len();
                state.peers.retain(|p| p.connection_id != id);
                state.peers.len() != before
            }
            DisconnectPolicy::Retain => false,
        };
        tracing::info!(connection_id = %id, removed, peers = state.peers.len(), "peer disconnected");
        removed
    }

    /// Returns the number of peers in the registry, stale ones included.
    pub async fn peer_count(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    /// Returns the most recently assigned identifier, if any.
    pub async fn last_assigned(&self) -> Option<ConnectionId> {
        self.state.lock().await.last_assigned()
    }

    /// Returns the identifiers of registered peers in connection order.
    pub async fn peer_ids(&self) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state.peers.iter().map(|p| p.connection_id).collect()
    }

    /// Captures the counter and the peer list in one consistent view.
    pub async fn snapshot(&self) -> RelaySnapshot {
        let state = self.state.lock().await;
        RelaySnapshot {
            last_assigned: state.last_assigned(),
            peers: state.peers.iter().map(PeerSummary::from).collect(),
        }
    }
}

impl RelayState {
    fn last_assigned(&self) -> Option<ConnectionId> {
        (self.counter > 0).then_some(ConnectionId::new(self.counter))
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(DisconnectPolicy::default())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn queue() -> (PeerSender, mpsc::Receiver<String>) {
        mpsc::channel(16)
    }

    fn next_envelope(rx: &mut mpsc::Receiver<String>) -> Option<Envelope> {
        let frame = rx.try_recv().ok()?;
        Envelope::from_frame(&frame).ok()
    }

    fn csrf(from: ConnectionId, value: &str) -> Envelope {
        Envelope::new(
            "CSRF_TOKEN",
            from,
            serde_json::json!({"name": "x-csrf-header", "value": value}),
        )
    }

    #[tokio::test]
    async fn ids_follow_connection_order() {
        let relay = Relay::default();
        let mut rxs = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = queue();
            ids.push(relay.on_connect(tx).await);
            rxs.push(rx);
        }
        let raw: Vec<u64> = ids.iter().map(|id| id.get()).collect();
        assert_eq!(raw, vec![1, 2, 3, 4, 5]);

        for (rx, id) in rxs.iter_mut().zip(&ids) {
            let Some(hello) = next_envelope(rx) else {
                panic!("expected connection assignment");
            };
            assert!(hello.is_connection());
            assert_eq!(hello.connection_id, *id);
        }
        assert_eq!(relay.last_assigned().await, Some(ConnectionId::new(5)));
    }

    #[tokio::test]
    async fn sender_never_receives_own_message() {
        let relay = Relay::default();
        let (tx_a, mut rx_a) = queue();
        let (tx_b, mut rx_b) = queue();
        let a = relay.on_connect(tx_a).await;
        let _b = relay.on_connect(tx_b).await;
        let _ = next_envelope(&mut rx_a);
        let _ = next_envelope(&mut rx_b);

        let delivered = relay.on_message(a, &csrf(a, "abc")).await;
        assert_eq!(delivered.ok(), Some(1));
        assert!(next_envelope(&mut rx_a).is_none());
        assert_eq!(next_envelope(&mut rx_b), Some(csrf(a, "abc")));
    }

    #[tokio::test]
    async fn every_other_peer_gets_an_equal_copy() {
        let relay = Relay::default();
        let (tx_p, mut rx_p) = queue();
        let (tx_q, mut rx_q) = queue();
        let (tx_r, mut rx_r) = queue();
        let p = relay.on_connect(tx_p).await;
        relay.on_connect(tx_q).await;
        relay.on_connect(tx_r).await;
        for rx in [&mut rx_p, &mut rx_q, &mut rx_r] {
            let _ = next_envelope(rx);
        }

        let sent = csrf(p, "token-1");
        assert_eq!(relay.on_message(p, &sent).await.ok(), Some(2));
        let q_copy = next_envelope(&mut rx_q);
        let r_copy = next_envelope(&mut rx_r);
        assert_eq!(q_copy, Some(sent.clone()));
        assert_eq!(r_copy, Some(sent));
        assert!(next_envelope(&mut rx_p).is_none());
    }

    #[tokio::test]
    async fn late_joiner_gets_no_history() {
        let relay = Relay::default();
        let (tx_a, _rx_a) = queue();
        let (tx_b, _rx_b) = queue();
        let a = relay.on_connect(tx_a).await;
        relay.on_connect(tx_b).await;
        let _ = relay.on_message(a, &csrf(a, "old")).await;

        let (tx_c, mut rx_c) = queue();
        let c = relay.on_connect(tx_c).await;
        let Some(hello) = next_envelope(&mut rx_c) else {
            panic!("expected connection assignment");
        };
        assert_eq!(hello.connection_id, c);
        assert!(next_envelope(&mut rx_c).is_none());

        let _ = relay.on_message(a, &csrf(a, "new")).await;
        assert_eq!(next_envelope(&mut rx_c), Some(csrf(a, "new")));
    }

    #[tokio::test]
    async fn reserved_types_are_not_relayed() {
        let relay = Relay::default();
        let (tx_a, _rx_a) = queue();
        let (tx_b, mut rx_b) = queue();
        let a = relay.on_connect(tx_a).await;
        relay.on_connect(tx_b).await;
        let _ = next_envelope(&mut rx_b);

        let forged = Envelope::connection(ConnectionId::new(99));
        let result = relay.on_message(a, &forged).await;
        assert!(matches!(result, Err(RelayError::ReservedType(_))));
        assert!(next_envelope(&mut rx_b).is_none());
    }

    #[tokio::test]
    async fn prune_policy_removes_disconnected_peer() {
        let relay = Relay::new(DisconnectPolicy::Prune);
        let (tx_a, _rx_a) = queue();
        let (tx_b, _rx_b) = queue();
        let a = relay.on_connect(tx_a).await;
        relay.on_connect(tx_b).await;

        assert!(relay.on_disconnect(a).await);
        assert_eq!(relay.peer_count().await, 1);
        assert!(!relay.on_disconnect(a).await);
    }

    #[tokio::test]
    async fn retain_policy_keeps_stale_peer() {
        let relay = Relay::new(DisconnectPolicy::Retain);
        let (tx_a, rx_a) = queue();
        let (tx_b, _rx_b) = queue();
        let a = relay.on_connect(tx_a).await;
        let b = relay.on_connect(tx_b).await;
        drop(rx_a);

        assert!(!relay.on_disconnect(a).await);
        assert_eq!(relay.peer_count().await, 2);
        assert_eq!(relay.on_message(b, &csrf(b, "x")).await.ok(), Some(0));
        assert_eq!(relay.peer_count().await, 2);

        let snapshot = relay.snapshot().await;
        assert!(snapshot.peers.iter().any(|p| p.connection_id == a && p.stale));
    }

    #[tokio::test]
    async fn closed_queue_is_pruned_on_broadcast() {
        let relay = Relay::new(DisconnectPolicy::Prune);
        let (tx_a, _rx_a) = queue();
        let (tx_b, rx_b) = queue();
        let a = relay.on_connect(tx_a).await;
        relay.on_connect(tx_b).await;
        drop(rx_b);

        assert_eq!(relay.on_message(a, &csrf(a, "x")).await.ok(), Some(0));
        assert_eq!(relay.peer_count().await, 1);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_prune() {
        let relay = Relay::new(DisconnectPolicy::Prune);
        let (tx_a, _rx_a) = queue();
        let a = relay.on_connect(tx_a).await;
        relay.on_disconnect(a).await;

        let (tx_b, _rx_b) = queue();
        assert_eq!(relay.on_connect(tx_b).await, ConnectionId::new(2));
    }

    #[tokio::test]
    async fn empty_relay_has_no_last_assigned() {
        let relay = Relay::default();
        assert_eq!(relay.last_assigned().await, None);
        assert_eq!(relay.peer_count().await, 0);
        assert!(relay.peer_ids().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_matches_registry_after_prune() {
        let relay = Relay::new(DisconnectPolicy::Prune);
        let (tx_a, _rx_a) = queue();
        let (tx_b, _rx_b) = queue();
        let (tx_c, _rx_c) = queue();
        relay.on_connect(tx_a).await;
        let b = relay.on_connect(tx_b).await;
        relay.on_connect(tx_c).await;
        relay.on_disconnect(b).await;

        let snapshot = relay.snapshot().await;
        let ids: Vec<u64> = snapshot.peer_ids().iter().map(|id| id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(snapshot.peer_count(), 2);
        assert_eq!(snapshot.last_assigned, Some(ConnectionId::new(3)));
        assert_eq!(relay.peer_ids().await, snapshot.peer_ids());
    }

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_string(&DisconnectPolicy::Retain).ok();
        assert_eq!(json.as_deref(), Some("\"retain\""));
    }
}
