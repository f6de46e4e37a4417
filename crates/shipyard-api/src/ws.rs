//! `WebSocket` handler for realtime build logs.
//!
//! Each connection registers with the [`RelayHub`](shipyard_relay::RelayHub)
//! and then runs one loop that both drains its outbound queue and reads
//! client frames. A client joins a room by sending
//! `{"event":"subscribe","data":"logs:<projectId>"}`; it then receives
//! `{"event":"message","data":...}` frames for the acknowledgement and for
//! every log line published on that channel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use shipyard_relay::RelayHub;
use shipyard_types::{ClientEvent, ConnectionId};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a realtime log connection.
///
/// # Route
///
/// `GET /` and `GET /ws` on the realtime server.
pub async fn ws_logs(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Run one connection until either side closes it.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut client = state.hub.connect().await;
    let id = client.id;

    loop {
        tokio::select! {
            event = client.events.recv() => {
                let Some(event) = event else {
                    debug!(connection = %id, "removed from hub, closing socket");
                    break;
                };
                let frame = match event.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(connection = %id, "Failed to serialize server event: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    debug!(connection = %id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    None => {
                        debug!(connection = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, "WebSocket error: {e}");
                        break;
                    }
                };
                match handle_inbound(&state.hub, id, msg).await {
                    Inbound::Continue => {}
                    Inbound::Reply(reply) => {
                        if socket.send(reply).await.is_err() {
                            debug!(connection = %id, "WebSocket client disconnected (reply failed)");
                            break;
                        }
                    }
                    Inbound::Close => {
                        debug!(connection = %id, "WebSocket client disconnected");
                        break;
                    }
                }
            }
        }
    }

    state.hub.disconnect(id).await;
}

/// What the connection loop does after one inbound frame.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    /// Keep reading.
    Continue,
    /// Send this frame back, then keep reading.
    Reply(Message),
    /// The client closed the connection.
    Close,
}

async fn handle_inbound(hub: &RelayHub, id: ConnectionId, msg: Message) -> Inbound {
    match msg {
        Message::Text(text) => {
            handle_frame(hub, id, text.as_str()).await;
            Inbound::Continue
        }
        Message::Ping(data) => Inbound::Reply(Message::Pong(data)),
        Message::Close(_) => Inbound::Close,
        Message::Binary(_) | Message::Pong(_) => Inbound::Continue,
    }
}

/// Apply one client text frame. Bad frames are logged and ignored.
async fn handle_frame(hub: &RelayHub, id: ConnectionId, text: &str) {
    match ClientEvent::from_frame(text) {
        Ok(ClientEvent::Subscribe(channel)) => {
            if let Err(e) = hub.subscribe(id, &channel).await {
                debug!(connection = %id, error = %e, "subscribe ignored");
            }
        }
        Err(e) => {
            debug!(connection = %id, error = %e, "malformed client frame ignored");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Bytes;
    use shipyard_relay::ClientHandle;

    use super::*;

    fn frames(client: &mut ClientHandle) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = client.events.try_recv() {
            out.push(event.to_frame().unwrap());
        }
        out
    }

    #[tokio::test]
    async fn subscribe_frame_joins_and_acknowledges() {
        let hub = RelayHub::default();
        let mut client = hub.connect().await;

        let text = r#"{"event":"subscribe","data":"logs:abc"}"#;
        let next = handle_inbound(&hub, client.id, Message::Text(text.into())).await;

        assert_eq!(next, Inbound::Continue);
        assert_eq!(
            frames(&mut client),
            vec![String::from(r#"{"event":"message","data":"Joined: logs:abc"}"#)]
        );
        assert_eq!(hub.member_count("logs:abc").await, 1);
    }

    #[tokio::test]
    async fn joined_client_receives_log_frames() {
        let hub = RelayHub::default();
        let mut client = hub.connect().await;
        handle_frame(&hub, client.id, r#"{"event":"subscribe","data":"logs:abc"}"#).await;
        frames(&mut client);

        hub.forward("logs:abc", "Build complete").await;

        assert_eq!(
            frames(&mut client),
            vec![String::from(r#"{"event":"message","data":"Build complete"}"#)]
        );
    }

    #[tokio::test]
    async fn malformed_frames_are_ignored() {
        let hub = RelayHub::default();
        let mut client = hub.connect().await;

        for text in [
            "not json",
            r#"{"event":"unsubscribe","data":"logs:abc"}"#,
            r#"{"event":"subscribe"}"#,
            r#"{"event":"subscribe","data":"   "}"#,
        ] {
            let next = handle_inbound(&hub, client.id, Message::Text(text.into())).await;
            assert_eq!(next, Inbound::Continue);
        }

        assert!(frames(&mut client).is_empty());
        assert_eq!(hub.room_count().await, 0);
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let hub = RelayHub::default();
        let client = hub.connect().await;
        let payload = Bytes::from_static(b"heartbeat");

        let next = handle_inbound(&hub, client.id, Message::Ping(payload.clone())).await;

        assert_eq!(next, Inbound::Reply(Message::Pong(payload)));
    }

    #[tokio::test]
    async fn close_frame_ends_the_connection() {
        let hub = RelayHub::default();
        let client = hub.connect().await;

        assert_eq!(
            handle_inbound(&hub, client.id, Message::Close(None)).await,
            Inbound::Close
        );
        assert_eq!(
            handle_inbound(&hub, client.id, Message::Binary(Bytes::new())).await,
            Inbound::Continue
        );
    }
}
