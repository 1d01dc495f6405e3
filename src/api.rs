//! Chat wire envelopes.
//!
//! The client speaks JSON over a WebSocket. Each inbound envelope carries the
//! client's view of the conversation; the server answers with an immediate
//! receipt ack and later the assistant reply.

use serde::{Deserialize, Serialize};

use crate::llm::Role;

/// One inbound chat envelope.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    /// Conversation as the client sees it, oldest first. The last entry is
    /// the message being sent now.
    pub messages: Vec<WireMessage>,
    /// Optional per-turn model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Optional per-turn temperature override.
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Everything the server sends back on the socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEnvelope {
    /// Immediate receipt, sent before the turn runs.
    MessageReceived { message: String },
    /// The assistant's reply for the turn.
    ChatResponse { role: Role, message: String },
}

impl OutboundEnvelope {
    #[must_use]
    pub fn ack() -> Self {
        OutboundEnvelope::MessageReceived {
            message: "Processing your request...".to_string(),
        }
    }

    #[must_use]
    pub fn reply(message: impl Into<String>) -> Self {
        OutboundEnvelope::ChatResponse {
            role: Role::Assistant,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_envelope_parses_with_overrides() {
        let json = r#"{
            "messages": [
                {"role": "user", "content": "Book me a flight"}
            ],
            "model": "gpt-4o-mini",
            "temperature": 0.2
        }"#;

        let envelope: InboundEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.messages.len(), 1);
        assert_eq!(envelope.messages[0].role, Role::User);
        assert_eq!(envelope.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(envelope.temperature, Some(0.2));
    }

    #[test]
    fn inbound_envelope_overrides_are_optional() {
        let json = r#"{"messages": []}"#;
        let envelope: InboundEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.model.is_none());
        assert!(envelope.temperature.is_none());
    }

    #[test]
    fn ack_envelope_shape() {
        let json = serde_json::to_value(OutboundEnvelope::ack()).unwrap();
        assert_eq!(json["type"], "message_received");
        assert!(json["message"].is_string());
    }

    #[test]
    fn reply_envelope_shape() {
        let json = serde_json::to_value(OutboundEnvelope::reply("Here you go.")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "chat_response",
                "role": "assistant",
                "message": "Here you go.",
            })
        );
    }
}
