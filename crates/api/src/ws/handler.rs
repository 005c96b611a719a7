use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use callpilot_orchestration::CaptionEvent;

use crate::state::AppState;

/// Caption frame sent by the sidebar: one raw caption observation.
#[derive(Debug, Deserialize)]
struct CaptionFrame {
    speaker: String,
    text: String,
    timestamp: Option<DateTime<Utc>>,
}

/// GET /api/session/{id}/ws
///
/// Inbound: caption frames, in observation order. Outbound: assist events
/// (segments, checklist completions, prompt updates) for this session.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let session_id = match ObjectId::parse_str(&session_id) {
        Ok(id) => id,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body("Invalid session id".into())
                .unwrap();
        }
    };

    if !state.engine.is_active(&session_id) {
        return Response::builder()
            .status(404)
            .body("No active session".into())
            .unwrap();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: ObjectId) {
    info!(%session_id, "Caption WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    // Send connected message
    {
        let msg = serde_json::json!({
            "type": "connected",
            "session_id": session_id.to_hex(),
        });
        let mut guard = sender.lock().await;
        let _ = guard
            .send(Message::text(msg.to_string()))
            .await;
    }

    // Forward this session's assist events to the socket.
    let mut events_rx = state.engine.subscribe();
    let event_sender = Arc::clone(&sender);
    let forward = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(event) if event.session_id() == session_id => {
                    let Ok(json) = serde_json::to_string(&event) else {
                        continue;
                    };
                    let mut guard = event_sender.lock().await;
                    if guard.send(Message::text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%session_id, skipped, "Assist event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Malformed frames get one warning, then the feed continues degraded.
    let mut warned_malformed = false;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<CaptionFrame>(&text) {
                Ok(frame) => {
                    let event = CaptionEvent {
                        speaker_name: frame.speaker,
                        text: frame.text,
                        timestamp: frame.timestamp.unwrap_or_else(Utc::now),
                    };
                    if !state.engine.send_caption(session_id, event).await {
                        debug!(%session_id, "Session worker gone, closing socket");
                        break;
                    }
                }
                Err(error) => {
                    if !warned_malformed {
                        warned_malformed = true;
                        warn!(%session_id, %error, "Malformed caption frame");
                        let msg = serde_json::json!({
                            "type": "warning",
                            "message": "Malformed caption frame; captions may be unavailable",
                        });
                        let mut guard = sender.lock().await;
                        let _ = guard.send(Message::text(msg.to_string())).await;
                    }
                }
            },
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(error) => {
                warn!(%session_id, %error, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    forward.abort();
    info!(%session_id, "Caption WebSocket disconnected");
}
