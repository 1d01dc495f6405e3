//! Tool registry and dispatch for the booking agent.
//!
//! Tools are the only way the model touches the booking workflow. Each tool
//! declares its parameters and whether it mutates anything; the dispatcher
//! validates arguments, enforces the confirmation gate, and folds every
//! failure into a structured tool result the model can read.

mod dispatch;
mod error;
mod registry;
pub mod travel;

pub use dispatch::Dispatcher;
pub use error::ToolError;
pub use registry::{ParamKind, ParamSpec, RegistryError, SideEffect, ToolRegistry, ToolSpec};

use async_trait::async_trait;

use crate::booking::BookingEngine;
use crate::llm::Message;

/// A tool implementation. Receives validated arguments as a JSON object.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        engine: &BookingEngine,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Outcome status of one tool call, carried in the result payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    Error,
}

/// Result of one dispatched tool call, ready to feed back to the model.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub call_id: String,
    pub status: CallStatus,
    pub payload: serde_json::Value,
}

impl ToolCallResult {
    #[must_use]
    pub fn ok(call_id: String, payload: serde_json::Value) -> Self {
        Self {
            call_id,
            status: CallStatus::Ok,
            payload,
        }
    }

    #[must_use]
    pub fn error(call_id: String, error: &ToolError) -> Self {
        Self {
            call_id,
            status: CallStatus::Error,
            payload: serde_json::json!({
                "error": {
                    "kind": error.kind(),
                    "message": error.to_string(),
                }
            }),
        }
    }

    /// Render as a tool-role message for the conversation log.
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message::tool_result(self.call_id.clone(), self.payload.to_string())
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == CallStatus::Ok
    }
}
