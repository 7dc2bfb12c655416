//! Per-tab client adapter.
//!
//! A [`ClientAdapter`] lazily owns the single channel from its tab to the
//! relay, remembers the identifier the relay assigned, and dispatches
//! inbound messages to locally registered callbacks by type tag.
//!
//! Connection state machine:
//!
//! ```text
//! Unconnected ──start()──▶ Connecting ──first CONNECTION──▶ Connected
//!      │                        │
//!      │                        └──connect error / channel closed──▶ Failed
//!      └──start() on unsupported connector──▶ Failed
//! ```
//!
//! There is no transition back and no reconnection. `Connecting` is entered
//! before the connector is awaited, so at most one channel is ever opened.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::connector::{Channel, Connector};
use super::registry::{Callback, EventRegistry};
use crate::domain::{ConnectionId, Envelope, TypedMessage};
use crate::error::ClientError;

/// Observable connection phase of a [`ClientAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `start` has not been called.
    Unconnected,
    /// `start` in flight, waiting for the relay's `CONNECTION` assignment.
    Connecting,
    /// Identifier assigned.
    Connected(ConnectionId),
    /// The relay is unreachable or the channel closed before assignment.
    Failed,
}

#[derive(Debug)]
enum ConnectionState {
    Unconnected,
    Connecting {
        // None until the connector returns.
        outbound: Option<mpsc::Sender<String>>,
        ready: Option<oneshot::Sender<ConnectionId>>,
    },
    Connected {
        connection_id: ConnectionId,
        outbound: mpsc::Sender<String>,
    },
    Failed,
}

struct Inner {
    state: Mutex<ConnectionState>,
    events: Mutex<EventRegistry>,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("state", &*lock(&self.state))
            .field("events", &*lock(&self.events))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-tab façade over the relay connection.
///
/// Cheap to clone; clones share the same connection and registry.
#[derive(Debug, Clone)]
pub struct ClientAdapter {
    inner: Arc<Inner>,
}

impl ClientAdapter {
    /// Creates an unconnected adapter with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ConnectionState::Unconnected),
                events: Mutex::new(EventRegistry::new()),
            }),
        }
    }

    /// Returns `true` iff the relay has assigned a positive identifier.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        matches!(
            &*lock(&self.inner.state),
            ConnectionState::Connected { connection_id, .. } if connection_id.is_assigned()
        )
    }

    /// Returns the assigned identifier, if connected.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self.phase() {
            Phase::Connected(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the current connection phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match &*lock(&self.inner.state) {
            ConnectionState::Unconnected => Phase::Unconnected,
            ConnectionState::Connecting { .. } => Phase::Connecting,
            ConnectionState::Connected { connection_id, .. } => Phase::Connected(*connection_id),
            ConnectionState::Failed => Phase::Failed,
        }
    }

    /// Opens the channel to the relay and waits for the identifier.
    ///
    /// Resolves once, when the first `CONNECTION` assignment arrives; every
    /// later message goes only through callback dispatch. Calling `start`
    /// on a connected adapter returns the existing identifier.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnsupportedCapability`] if `connector` reports no
    ///   relay support. The adapter moves to [`Phase::Failed`].
    /// - [`ClientError::Transport`] if the channel cannot be opened (the
    ///   adapter moves to [`Phase::Failed`]), if another `start` is already
    ///   in flight, or if the adapter has already failed.
    /// - [`ClientError::ChannelClosed`] if the channel closes before the
    ///   identifier is assigned. The adapter moves to [`Phase::Failed`].
    pub async fn start<C: Connector + Sync>(&self, connector: &C) -> Result<ConnectionId, ClientError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        {
            let mut state = lock(&self.inner.state);
            match &*state {
                ConnectionState::Connected { connection_id, .. } => return Ok(*connection_id),
                ConnectionState::Connecting { .. } => {
                    return Err(ClientError::Transport("start already in progress".to_string()));
                }
                ConnectionState::Failed => {
                    return Err(ClientError::Transport(
                        "adapter has failed and does not reconnect".to_string(),
                    ));
                }
                ConnectionState::Unconnected => {}
            }
            if !connector.is_supported() {
                *state = ConnectionState::Failed;
                tracing::warn!("shared relay channel not supported");
                return Err(ClientError::UnsupportedCapability(
                    "connector reports no shared relay channel".to_string(),
                ));
            }
            *state = ConnectionState::Connecting {
                outbound: None,
                ready: Some(ready_tx),
            };
        }

        let Channel { outbound, inbound } = match connector.connect().await {
            Ok(channel) => channel,
            Err(e) => {
                *lock(&self.inner.state) = ConnectionState::Failed;
                tracing::warn!(error = %e, "could not open relay channel");
                return Err(e);
            }
        };
        {
            let mut state = lock(&self.inner.state);
            if let ConnectionState::Connecting { outbound: slot, .. } = &mut *state {
                *slot = Some(outbound);
            }
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(receive_loop(inner, inbound));

        ready_rx.await.map_err(|_| ClientError::ChannelClosed)
    }

    /// Registers `callback` for messages tagged `msg_type`.
    ///
    /// Callbacks for one tag run in registration order and receive the raw
    /// envelope.
    pub fn add_event<F>(&self, msg_type: impl Into<String>, callback: F)
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let msg_type = msg_type.into();
        let callback: Callback = Arc::new(callback);
        let mut events = lock(&self.inner.events);
        events.add(msg_type.as_str(), callback);
        tracing::debug!(
            msg_type = %msg_type,
            callbacks = events.count(&msg_type),
            total = events.len(),
            "event registered"
        );
    }

    /// Registers a callback that receives decoded `T` payloads.
    ///
    /// Payloads that do not decode as `T` are logged and skipped.
    pub fn on<T, F>(&self, callback: F)
    where
        T: TypedMessage + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.add_event(T::TYPE, move |envelope: &Envelope| {
            match serde_json::from_value::<T>(envelope.msg.clone()) {
                Ok(payload) => callback(payload),
                Err(e) => {
                    tracing::warn!(msg_type = T::TYPE, error = %e, "payload did not match registered type");
                }
            }
        });
    }

    /// Publishes `payload` under `msg_type` to every other tab.
    ///
    /// Returns `Ok(false)` without touching the channel when not connected,
    /// and when the outbound queue is full.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Encode`] if `payload` cannot be serialized.
    /// - [`ClientError::ChannelClosed`] if the relay side has gone away.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T, msg_type: &str) -> Result<bool, ClientError> {
        let state = lock(&self.inner.state);
        let ConnectionState::Connected {
            connection_id,
            outbound,
        } = &*state
        else {
            tracing::debug!(msg_type, "not connected, message dropped");
            return Ok(false);
        };

        let frame = Envelope::new(msg_type, *connection_id, serde_json::to_value(payload)?).to_frame()?;
        match outbound.try_send(frame) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(msg_type, "outbound queue full, message dropped");
                Ok(false)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ClientError::ChannelClosed),
        }
    }

    /// Publishes a typed payload under its own tag.
    ///
    /// # Errors
    ///
    /// Same as [`ClientAdapter::send`].
    pub fn send_typed<T: TypedMessage>(&self, payload: &T) -> Result<bool, ClientError> {
        self.send(payload, T::TYPE)
    }
}

impl Default for ClientAdapter {
    fn default() -> Self {
        Self::new()
    }
}

async fn receive_loop(inner: Arc<Inner>, mut inbound: mpsc::Receiver<String>) {
    while let Some(frame) = inbound.recv().await {
        match Envelope::from_frame(&frame) {
            Ok(envelope) => inner.dispatch(&envelope),
            Err(e) => tracing::warn!(error = %e, "malformed frame from relay"),
        }
    }

    let mut state = lock(&inner.state);
    if matches!(&*state, ConnectionState::Connecting { .. }) {
        // Drops the readiness sender, failing the pending `start`.
        *state = ConnectionState::Failed;
    }
    tracing::debug!("relay channel closed");
}

impl Inner {
    fn dispatch(&self, envelope: &Envelope) {
        if envelope.is_connection() {
            self.assign(envelope.connection_id);
        }

        let callbacks = {
            let events = lock(&self.events);
            if events.is_empty() {
                return;
            }
            events.callbacks_for(&envelope.msg_type)
        };
        for callback in callbacks {
            callback(envelope);
        }
    }

    fn assign(&self, id: ConnectionId) {
        if !id.is_assigned() {
            tracing::warn!("ignoring connection assignment without identifier");
            return;
        }
        let mut state = lock(&self.state);
        let current = std::mem::replace(&mut *state, ConnectionState::Unconnected);
        *state = match current {
            ConnectionState::Connecting {
                outbound: Some(outbound),
                ready,
            } => {
                if let Some(ready) = ready {
                    let _ = ready.send(id);
                }
                tracing::info!(connection_id = %id, "connected to relay");
                ConnectionState::Connected {
                    connection_id: id,
                    outbound,
                }
            }
            other => {
                tracing::debug!(connection_id = %id, "ignoring repeated connection assignment");
                other
            }
        };
    }
}
