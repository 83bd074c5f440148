//! WebSocket frame ingest
//!
//! One socket per participant. The client joins a room with a text message,
//! then streams encoded camera frames as binary messages. Each frame's
//! analysis is sent back to that socket only. Closing the socket ends the
//! session.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use engagement::{BehaviorLabel, ConnectionId, EngagementError, VideoFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SharedState;

/// Client to server messages
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom {
        room_id: String,
        display_name: String,
    },
}

/// Server to client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Joined {
        connection_id: ConnectionId,
        room_id: String,
    },
    AnalysisResult {
        attention_level: f32,
        behavior: BehaviorLabel,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Per-socket connection state
pub struct SocketSession {
    state: SharedState,
    conn: ConnectionId,
    joined: bool,
    sequence: u32,
}

impl SocketSession {
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            conn: ConnectionId::new(),
            joined: false,
            sequence: 0,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn
    }

    pub fn handle_text(&mut self, text: &str) -> Option<ServerMessage> {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(conn = %self.conn, "Unparseable client message: {}", e);
                return Some(ServerMessage::error(format!("invalid message: {}", e)));
            }
        };

        match message {
            ClientMessage::JoinRoom {
                room_id,
                display_name,
            } => Some(self.join(room_id, display_name)),
        }
    }

    fn join(&mut self, room_id: String, display_name: String) -> ServerMessage {
        if self.joined {
            return ServerMessage::error("already joined");
        }

        match self.state.store.on_join(self.conn, &room_id, &display_name) {
            Ok(()) => {
                self.joined = true;
                metrics::gauge!("live_sessions").set(self.state.store.len() as f64);
                ServerMessage::Joined {
                    connection_id: self.conn,
                    room_id,
                }
            }
            Err(e) => ServerMessage::error(e.to_string()),
        }
    }

    /// Decode and analyze one frame. Frames before join and undecodable
    /// images produce no reply.
    pub async fn handle_binary(&mut self, bytes: Vec<u8>) -> Option<ServerMessage> {
        if !self.joined {
            debug!(conn = %self.conn, "Frame before join ignored");
            return None;
        }

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        let timestamp_ns = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let decoded = tokio::task::spawn_blocking(move || {
            VideoFrame::decode(&bytes, timestamp_ns, sequence)
        })
        .await;
        let frame = match decoded {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!(conn = %self.conn, sequence, "Dropping undecodable frame: {}", e);
                return None;
            }
            Err(e) => {
                warn!(conn = %self.conn, sequence, "Frame decode task failed: {}", e);
                return None;
            }
        };

        self.state
            .pipeline
            .process(self.conn, frame)
            .await
            .map(|result| ServerMessage::AnalysisResult {
                attention_level: result.attention_level,
                behavior: result.behavior,
            })
    }

    /// End the session, if one was started
    pub fn close(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;

        match self.state.store.on_leave(self.conn) {
            Ok(()) | Err(EngagementError::UnknownSession(_)) => {}
            Err(e) => warn!(conn = %self.conn, "Leave failed: {}", e),
        }
        metrics::gauge!("live_sessions").set(self.state.store.len() as f64);
    }
}

/// Upgrade to a WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: SharedState) {
    let mut session = SocketSession::new(state);
    debug!(conn = %session.connection_id(), "Socket connected");

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!(conn = %session.connection_id(), "Socket error: {}", e);
                break;
            }
        };

        let reply = match message {
            Message::Text(text) => session.handle_text(&text),
            Message::Binary(bytes) => session.handle_binary(bytes).await,
            Message::Close(_) => break,
            _ => None,
        };

        let Some(reply) = reply else {
            continue;
        };
        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize reply: {}", e);
                continue;
            }
        };
        if socket.send(Message::Text(json)).await.is_err() {
            break;
        }
    }

    session.close();
    debug!(conn = %session.connection_id(), "Socket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn join_text(room: &str, name: &str) -> String {
        format!(
            r#"{{"type":"join-room","room_id":"{}","display_name":"{}"}}"#,
            room, name
        )
    }

    #[test]
    fn test_client_message_wire_format() {
        let message: ClientMessage = serde_json::from_str(&join_text("r1", "Alice")).unwrap();
        assert_eq!(
            message,
            ClientMessage::JoinRoom {
                room_id: "r1".to_string(),
                display_name: "Alice".to_string(),
            }
        );

        let reply = serde_json::to_value(ServerMessage::AnalysisResult {
            attention_level: 0.8,
            behavior: BehaviorLabel::Calm,
        })
        .unwrap();
        assert_eq!(reply["type"], "analysis-result");
        assert_eq!(reply["behavior"], "calm");
    }

    #[tokio::test]
    async fn test_join_and_frame() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());
        let mut session = SocketSession::new(state.clone());
        let conn = session.connection_id();

        let reply = session.handle_text(&join_text("r1", "Alice"));
        assert_eq!(
            reply,
            Some(ServerMessage::Joined {
                connection_id: conn,
                room_id: "r1".to_string(),
            })
        );

        // Mock oracles: centered gaze on a grey frame, mostly neutral face
        let reply = session.handle_binary(test_support::png_bytes()).await;
        assert_eq!(
            reply,
            Some(ServerMessage::AnalysisResult {
                attention_level: 0.8,
                behavior: BehaviorLabel::Calm,
            })
        );

        let snapshot = state.store.snapshot(conn).unwrap();
        assert_eq!(snapshot.attention_history, vec![0.8]);
        assert_eq!(snapshot.behavior_history, vec![BehaviorLabel::Calm]);
    }

    #[tokio::test]
    async fn test_frame_before_join_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());
        let mut session = SocketSession::new(state.clone());

        assert_eq!(session.handle_binary(test_support::png_bytes()).await, None);
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_frame_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());
        let mut session = SocketSession::new(state.clone());
        session.handle_text(&join_text("r1", "Alice"));

        assert_eq!(session.handle_binary(vec![0, 1, 2, 3]).await, None);
        let snapshot = state.store.snapshot(session.connection_id()).unwrap();
        assert!(snapshot.attention_history.is_empty());
    }

    #[test]
    fn test_second_join_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());
        let mut session = SocketSession::new(state.clone());

        session.handle_text(&join_text("r1", "Alice"));
        let reply = session.handle_text(&join_text("r2", "Alice"));
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
        assert_eq!(state.store.participants("r1").len(), 1);
        assert!(state.store.participants("r2").is_empty());
    }

    #[test]
    fn test_invalid_message() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());
        let mut session = SocketSession::new(state);

        let reply = session.handle_text(r#"{"type":"shout"}"#);
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
    }

    #[test]
    fn test_close_ends_session() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_support::state(tmp.path());
        let mut session = SocketSession::new(state.clone());
        session.handle_text(&join_text("r1", "Alice"));
        assert_eq!(state.store.len(), 1);

        session.close();
        assert!(state.store.is_empty());
        assert!(!state.store.contains(session.connection_id()));

        // Closing twice is harmless
        session.close();
    }
}
