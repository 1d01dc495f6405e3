//! Tool error taxonomy.
//!
//! Every failure a tool can hit is folded into one of these variants and
//! reported back through the tool-result channel so the model can react.
//! Errors never abort the turn.

use thiserror::Error;

use crate::adapter::ProviderError;
use crate::booking::BookingError;

#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments failed schema validation.
    #[error("invalid arguments: {0}")]
    Validation(String),

    /// A mutating tool was requested before the user confirmed.
    #[error("booking is not confirmed: {0}")]
    NotConfirmed(String),

    /// The tool exceeded its execution bound.
    #[error("tool timed out")]
    Timeout,

    /// The provider pushed back; safe to try again later.
    #[error("provider rate limited")]
    RateLimited,

    /// The provider could not be reached, including exhausted retries.
    #[error("provider unavailable")]
    Unavailable,

    /// A referenced offer or booking does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A referenced offer is no longer bookable.
    #[error("offer expired: {0}")]
    Expired(String),

    /// The provider refused the booking.
    #[error("booking rejected: {0}")]
    Rejected(String),

    /// The operation is not legal in the current workflow state.
    #[error("{0}")]
    InvalidState(String),

    /// Anything else.
    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Stable machine-readable kind, part of the tool-result contract.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Validation(_) => "validation_error",
            ToolError::NotConfirmed(_) => "not_confirmed",
            ToolError::Timeout => "timeout",
            ToolError::RateLimited => "rate_limited",
            ToolError::Unavailable => "unavailable",
            ToolError::NotFound(_) => "not_found",
            ToolError::Expired(_) => "expired",
            ToolError::Rejected(_) => "rejected",
            ToolError::InvalidState(_) => "invalid_state",
            ToolError::ExecutionFailed(_) => "execution_failed",
        }
    }
}

impl From<ProviderError> for ToolError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::RateLimited => ToolError::RateLimited,
            ProviderError::Unavailable => ToolError::Unavailable,
            ProviderError::NotFound(what) => ToolError::NotFound(what),
            ProviderError::Expired(what) => ToolError::Expired(what),
            ProviderError::Rejected(reason) => ToolError::Rejected(reason),
        }
    }
}

impl From<BookingError> for ToolError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::Provider(p) => p.into(),
            BookingError::SearchUnavailable { .. } => ToolError::Unavailable,
            BookingError::Timeout => ToolError::Timeout,
            BookingError::InvalidState(msg) => ToolError::InvalidState(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ToolError::UnknownTool("x".into()).kind(), "unknown_tool");
        assert_eq!(ToolError::Validation("x".into()).kind(), "validation_error");
        assert_eq!(ToolError::Timeout.kind(), "timeout");
        assert_eq!(ToolError::NotConfirmed("x".into()).kind(), "not_confirmed");
    }

    #[test]
    fn provider_errors_map_onto_kinds() {
        assert_eq!(ToolError::from(ProviderError::RateLimited).kind(), "rate_limited");
        assert_eq!(
            ToolError::from(ProviderError::Expired("FL-1".into())).kind(),
            "expired"
        );
        assert_eq!(
            ToolError::from(ProviderError::Rejected("declined".into())).kind(),
            "rejected"
        );
    }

    #[test]
    fn exhausted_search_reads_as_unavailable() {
        let e = ToolError::from(BookingError::SearchUnavailable { attempts: 3 });
        assert_eq!(e.kind(), "unavailable");
    }
}
