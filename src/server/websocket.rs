//! WebSocket transport
//!
//! Bridges an upgraded axum `WebSocket` to a hub connection: frames read from
//! the socket are delivered to the hub, payloads queued by the hub are written
//! back to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};

use crate::hub::BroadcastHub;
use crate::registry::GroupName;
use crate::session::PeerLink;

/// Attach an upgraded socket to `group` and serve it until either side closes
pub async fn serve_socket(hub: Arc<BroadcastHub>, group: GroupName, socket: WebSocket) {
    let (conn, link) = hub.connection();
    let id = conn.id();

    let ((), reason) = tokio::join!(pump(socket, link), hub.on_connect(group.clone(), conn));

    tracing::debug!(
        group = %group,
        connection_id = %id,
        reason = %reason,
        "WebSocket session finished"
    );
}

/// Move frames between the socket and the link until either side closes
///
/// Reading and writing run as independent loops, so payloads queued by the
/// hub keep draining while the hub's inbound queue is full.
async fn pump(socket: WebSocket, mut link: PeerLink) {
    let (mut sink, mut stream) = socket.split();
    let id = link.id();
    let peer = link.sender();

    let reader = async move {
        loop {
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = peer.closed() => break,
            };
            let payload = match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    Bytes::copy_from_slice(text.as_str().as_bytes())
                }
                Some(Ok(WsMessage::Binary(data))) => data,
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Err(e)) => {
                    peer.fail(e.to_string()).await;
                    break;
                }
            };
            if peer.deliver(payload).await.is_err() {
                break;
            }
        }
        // Payloads already delivered still reach the hub
        peer.close();
    };

    let writer = async move {
        while let Some(payload) = link.next_outbound().await {
            if let Err(e) = sink.send(to_frame(payload)).await {
                tracing::debug!(connection_id = %id, error = %e, "WebSocket write failed");
                link.close();
                return;
            }
        }
        let _ = sink.send(WsMessage::Close(None)).await;
    };

    tokio::join!(reader, writer);
}

/// Valid UTF-8 goes out as a text frame, anything else as binary
fn to_frame(payload: Bytes) -> WsMessage {
    match std::str::from_utf8(&payload) {
        Ok(text) => WsMessage::Text(text.into()),
        Err(_) => WsMessage::Binary(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_is_text_frame() {
        let frame = to_frame(Bytes::from_static(br#"{"id_expediente":1}"#));
        assert!(matches!(frame, WsMessage::Text(ref t) if t.as_str() == r#"{"id_expediente":1}"#));
    }

    #[test]
    fn test_binary_payload_is_binary_frame() {
        let frame = to_frame(Bytes::from_static(&[0xff, 0xfe, 0x00]));
        assert!(matches!(frame, WsMessage::Binary(ref b) if b[..] == [0xff, 0xfe, 0x00]));
    }
}
