//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection: inbound
//! text frames are decoded and handed to the relay, and frames queued for
//! this peer are written to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::domain::{ConnectionId, Envelope, Relay};
use crate::error::RelayError;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Registers the connection with the relay, which queues the
///   `CONNECTION` assignment ahead of anything else.
/// - Forwards inbound envelopes to [`Relay::on_message`]. Rejected frames
///   are answered with an `ERROR` frame to this socket only.
/// - Writes frames queued by the relay to the socket.
pub async fn run_connection(socket: WebSocket, relay: Arc<Relay>, capacity: usize) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (peer_tx, mut peer_rx) = mpsc::channel::<String>(capacity.max(1));
    let connection_id = relay.on_connect(peer_tx).await;

    loop {
        tokio::select! {
            // Incoming frame from the tab
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_text_message(&relay, connection_id, text.as_str()).await
                            && let Some(frame) = error_frame(&e)
                            && ws_tx.send(Message::text(frame)).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "ws read failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            // Frame relayed from another tab
            frame = peer_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if ws_tx.send(Message::text(frame)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    relay.on_disconnect(connection_id).await;
    tracing::debug!(connection_id = %connection_id, "ws connection closed");
}

/// Decodes one text frame and relays it on behalf of `from`.
///
/// The relay trusts the socket, not the frame: exclusion uses `from` even
/// if the frame claims another `connectionId`.
async fn handle_text_message(
    relay: &Relay,
    from: ConnectionId,
    text: &str,
) -> Result<usize, RelayError> {
    let envelope =
        Envelope::from_frame(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))?;
    if envelope.connection_id != from {
        tracing::debug!(
            connection_id = %from,
            claimed = %envelope.connection_id,
            "frame connectionId differs from socket"
        );
    }
    relay.on_message(from, &envelope).await
}

/// Encodes `err` as an `ERROR` frame.
fn error_frame(err: &RelayError) -> Option<String> {
    Envelope::error(err.error_code(), &err.to_string())
        .to_frame()
        .ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_frame_is_rejected() {
        let relay = Relay::default();
        let result = handle_text_message(&relay, ConnectionId::new(1), "{not json").await;
        assert!(matches!(result, Err(RelayError::MalformedMessage(_))));
    }

    #[tokio::test]
    async fn exclusion_uses_socket_identity() {
        let relay = Relay::default();
        let (tx_a, _rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let a = relay.on_connect(tx_a).await;
        relay.on_connect(tx_b).await;
        let _ = rx_b.try_recv();

        // Frame claims to come from b; it still reaches b because the socket is a.
        let frame = r#"{"type":"CSRF_TOKEN","connectionId":2,"msg":"abc"}"#;
        let delivered = handle_text_message(&relay, a, frame).await;
        assert_eq!(delivered.ok(), Some(1));
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn error_frame_carries_code() {
        let Some(frame) = error_frame(&RelayError::ReservedType("CONNECTION".to_string())) else {
            panic!("error frame should encode");
        };
        let Ok(envelope) = Envelope::from_frame(&frame) else {
            panic!("error frame should decode");
        };
        assert_eq!(envelope.msg_type, "ERROR");
        assert_eq!(envelope.msg["code"], 1002);
    }
}
