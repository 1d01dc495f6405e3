//! LLM error types.

use thiserror::Error;

/// Errors from the chat completion API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed (includes client-side timeout).
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response had no choices to interpret.
    #[error("empty response from model")]
    EmptyResponse,
}
