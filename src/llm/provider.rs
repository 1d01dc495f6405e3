//! LLM provider trait.

use async_trait::async_trait;

use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse, Message};

/// A chat completion backend.
///
/// The model is an untrusted collaborator: callers must validate whatever
/// comes back (tool names, arguments) before acting on it.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Pull the first choice's message out of a response.
pub fn first_message(response: ChatResponse) -> Result<Message, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or(LlmError::EmptyResponse)
}
