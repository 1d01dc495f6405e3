//! HTTP and WebSocket handlers.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, info, warn};

use crate::api::{InboundEnvelope, OutboundEnvelope};
use crate::booking::BookingEngine;
use crate::llm::{Message, Role};
use crate::server::AppState;
use crate::session::{SessionRecord, TurnOverrides};

/// Reply sent when the turn itself blows up (model transport failure).
const TURN_FAILURE_REPLY: &str =
    "Sorry, something went wrong on my end. Nothing has been booked. Please try again.";

// ============================================================================
// Health
// ============================================================================

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[derive(Serialize)]
pub struct ReadyzResponse {
    pub status: String,
    pub active_sessions: usize,
}

pub async fn readyz(State(state): State<AppState>) -> Json<ReadyzResponse> {
    Json(ReadyzResponse {
        status: "ok".to_string(),
        active_sessions: state.sessions.len(),
    })
}

// ============================================================================
// Chat Socket
// ============================================================================

/// Upgrade to a chat socket, subject to the connection cap.
pub async fn ws_chat(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    match Arc::clone(&state.capacity).try_acquire_owned() {
        Ok(permit) => ws.on_upgrade(move |socket| handle_socket(state, socket, permit)),
        Err(_) => {
            warn!("Connection rejected: session capacity reached");
            (StatusCode::SERVICE_UNAVAILABLE, "server at capacity").into_response()
        }
    }
}

/// One socket, one session, one booking workflow. The session dies with the
/// connection.
async fn handle_socket(state: AppState, mut socket: WebSocket, _permit: OwnedSemaphorePermit) {
    let engine = Arc::new(BookingEngine::new(
        Arc::clone(&state.adapter),
        state.engine_config.clone(),
    ));
    let session = state.sessions.create(engine);
    info!(session_id = %session.id, "Chat connected");

    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                if handle_envelope(&state, &session, &mut socket, text.as_str())
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Ok(WsMessage::Close(_)) | Err(_) => break,
            // Pings are answered by axum; ignore everything else.
            Ok(_) => {}
        }
    }

    state.sessions.remove(&session.id);
    info!(session_id = %session.id, "Chat disconnected");
}

/// Process one inbound envelope end to end: ack, run the turn, reply.
///
/// Returns `Err` only when the socket itself is gone.
async fn handle_envelope(
    state: &AppState,
    session: &SessionRecord,
    socket: &mut WebSocket,
    text: &str,
) -> Result<(), axum::Error> {
    session.touch();

    let envelope: InboundEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(session_id = %session.id, error = %e, "Malformed chat envelope");
            return send(
                socket,
                &OutboundEnvelope::reply("I couldn't read that message. Please try again."),
            )
            .await;
        }
    };

    send(socket, &OutboundEnvelope::ack()).await?;

    // Turns within a session serialize; a second message waits its turn.
    let _turn = session.turn_lock.lock().await;

    seed_or_append(state, session, &envelope).await;
    let history = session.snapshot_messages().await;

    let overrides = TurnOverrides {
        model: envelope.model,
        temperature: envelope.temperature,
    };
    let reply = match state.turn.run_turn(&session.engine, &history, &overrides).await {
        Ok(outcome) => {
            session.append_messages(outcome.appended).await;
            outcome.reply
        }
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Turn failed");
            session
                .append_messages([Message::text(Role::Assistant, TURN_FAILURE_REPLY)])
                .await;
            TURN_FAILURE_REPLY.to_string()
        }
    };

    send(socket, &OutboundEnvelope::reply(reply)).await
}

/// First contact seeds the log from the client's envelope, with the server's
/// system prompt in front unless the client supplied one. After that the log
/// is authoritative and only the trailing message is appended.
async fn seed_or_append(state: &AppState, session: &SessionRecord, envelope: &InboundEnvelope) {
    if session.is_empty().await {
        let mut seeded = Vec::with_capacity(envelope.messages.len() + 1);
        if !envelope.messages.iter().any(|m| m.role == Role::System) {
            seeded.push(Message::text(Role::System, state.system_prompt.as_str()));
        }
        seeded.extend(
            envelope
                .messages
                .iter()
                .map(|m| Message::text(m.role, m.content.clone())),
        );
        session.append_messages(seeded).await;
    } else if let Some(last) = envelope.messages.last() {
        session
            .append_messages([Message::text(last.role, last.content.clone())])
            .await;
    }
}

async fn send(socket: &mut WebSocket, envelope: &OutboundEnvelope) -> Result<(), axum::Error> {
    let json = serde_json::to_string(envelope).map_err(axum::Error::new)?;
    socket.send(WsMessage::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn livez_is_ok() {
        let (status, body) = livez().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
