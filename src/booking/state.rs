//! Workflow states and the legal transitions between them.

use serde::{Deserialize, Serialize};

/// Booking workflow state for one itinerary.
///
/// States advance strictly in this order, or drop to `Failed` from any
/// non-terminal state. There is no backward edge: a regression is a bug in
/// the caller, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    CollectingRequirements,
    Searching,
    PresentingOptions,
    AwaitingSelection,
    AwaitingConfirmation,
    BookingInProgress,
    Confirmed,
    Failed,
}

impl WorkflowState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Confirmed | WorkflowState::Failed)
    }

    /// Whether `next` is reachable from this state in one step.
    #[must_use]
    pub fn permits(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (CollectingRequirements, Searching)
                | (Searching, PresentingOptions)
                | (PresentingOptions, AwaitingSelection)
                | (AwaitingSelection, AwaitingConfirmation)
                | (AwaitingConfirmation, BookingInProgress)
                | (BookingInProgress, Confirmed)
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::CollectingRequirements => "collecting_requirements",
            WorkflowState::Searching => "searching",
            WorkflowState::PresentingOptions => "presenting_options",
            WorkflowState::AwaitingSelection => "awaiting_selection",
            WorkflowState::AwaitingConfirmation => "awaiting_confirmation",
            WorkflowState::BookingInProgress => "booking_in_progress",
            WorkflowState::Confirmed => "confirmed",
            WorkflowState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
