//! Capability check and transport primitive for reaching a relay.
//!
//! A [`Connector`] answers whether the shared relay channel is available in
//! the current environment and, if it is, opens a [`Channel`]: a FIFO pair
//! of bounded queues carrying JSON text frames.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::domain::{Envelope, Relay};
use crate::error::ClientError;

/// Default capacity of each direction of a client channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// An open, bidirectional connection to a relay.
#[derive(Debug)]
pub struct Channel {
    /// Frames from this tab to the relay.
    pub outbound: mpsc::Sender<String>,
    /// Frames from the relay to this tab.
    pub inbound: mpsc::Receiver<String>,
}

/// Opens channels to a relay.
pub trait Connector {
    /// Returns `true` if this environment can reach a shared relay.
    fn is_supported(&self) -> bool;

    /// Opens a new channel to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the channel cannot be opened.
    fn connect(&self) -> impl Future<Output = Result<Channel, ClientError>> + Send;
}

/// Reaches a relay service over its `/ws` WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    capacity: usize,
}

impl WsConnector {
    /// Creates a connector for the given `ws://` or `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Overrides the queue capacity. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    fn is_supported(&self) -> bool {
        self.url.starts_with("ws://") || self.url.starts_with("wss://")
    }

    async fn connect(&self) -> Result<Channel, ClientError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let (mut ws_tx, mut ws_rx) = stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<String>(self.capacity);
        let (in_tx, in_rx) = mpsc::channel::<String>(self.capacity);

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = ws_tx.send(Message::text(frame)).await {
                    tracing::warn!(error = %e, "ws write failed");
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(text.as_str().to_owned()).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "ws read failed");
                        break;
                    }
                }
            }
            tracing::debug!("ws reader finished");
        });

        tracing::debug!(url = %self.url, "ws channel open");
        Ok(Channel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Reaches a [`Relay`] running in the same process.
#[derive(Debug, Clone)]
pub struct LocalConnector {
    relay: Arc<Relay>,
    capacity: usize,
}

impl LocalConnector {
    /// Creates a connector for `relay`.
    #[must_use]
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Overrides the queue capacity. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

impl Connector for LocalConnector {
    fn is_supported(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<Channel, ClientError> {
        let (to_tab_tx, to_tab_rx) = mpsc::channel::<String>(self.capacity);
        let (to_relay_tx, mut to_relay_rx) = mpsc::channel::<String>(self.capacity);

        let errors = to_tab_tx.clone();
        let id = self.relay.on_connect(to_tab_tx).await;
        let relay = Arc::clone(&self.relay);

        tokio::spawn(async move {
            while let Some(frame) = to_relay_rx.recv().await {
                let result = match Envelope::from_frame(&frame) {
                    Ok(envelope) => relay.on_message(id, &envelope).await.map(|_| ()),
                    Err(e) => Err(crate::error::RelayError::MalformedMessage(e.to_string())),
                };
                if let Err(e) = result
                    && let Ok(frame) = Envelope::error(e.error_code(), &e.to_string()).to_frame()
                {
                    let _ = errors.try_send(frame);
                }
            }
            relay.on_disconnect(id).await;
        });

        Ok(Channel {
            outbound: to_relay_tx,
            inbound: to_tab_rx,
        })
    }
}
