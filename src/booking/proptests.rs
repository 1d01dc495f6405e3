//! Property-based tests for the workflow state machine.
//!
//! These verify the ordering invariants hold across all transition sequences,
//! not just the hand-picked cases.

use proptest::prelude::*;

use super::state::WorkflowState;

const ALL: [WorkflowState; 8] = [
    WorkflowState::CollectingRequirements,
    WorkflowState::Searching,
    WorkflowState::PresentingOptions,
    WorkflowState::AwaitingSelection,
    WorkflowState::AwaitingConfirmation,
    WorkflowState::BookingInProgress,
    WorkflowState::Confirmed,
    WorkflowState::Failed,
];

fn order_index(state: WorkflowState) -> usize {
    ALL.iter()
        .position(|s| *s == state)
        .unwrap_or(usize::MAX)
}

fn arb_state() -> impl Strategy<Value = WorkflowState> {
    prop_oneof![
        Just(WorkflowState::CollectingRequirements),
        Just(WorkflowState::Searching),
        Just(WorkflowState::PresentingOptions),
        Just(WorkflowState::AwaitingSelection),
        Just(WorkflowState::AwaitingConfirmation),
        Just(WorkflowState::BookingInProgress),
        Just(WorkflowState::Confirmed),
        Just(WorkflowState::Failed),
    ]
}

proptest! {
    /// A permitted transition is either the immediate successor or a drop to
    /// Failed. Nothing else.
    #[test]
    fn permitted_transitions_advance_by_one_or_fail(
        from in arb_state(),
        to in arb_state(),
    ) {
        if from.permits(to) {
            if to == WorkflowState::Failed {
                prop_assert!(!from.is_terminal());
            } else {
                prop_assert_eq!(order_index(to), order_index(from) + 1);
            }
        }
    }

    /// No sequence of permitted transitions ever moves the state backward.
    #[test]
    fn transition_sequences_are_monotonic(
        requests in proptest::collection::vec(arb_state(), 0..32),
    ) {
        let mut state = WorkflowState::CollectingRequirements;
        for next in requests {
            let before = order_index(state);
            if state.permits(next) {
                state = next;
            }
            prop_assert!(order_index(state) >= before);
        }
    }

    /// Once terminal, a state stays terminal no matter what is requested.
    #[test]
    fn terminal_states_are_absorbing(
        requests in proptest::collection::vec(arb_state(), 1..32),
    ) {
        for terminal in [WorkflowState::Confirmed, WorkflowState::Failed] {
            let mut state = terminal;
            for next in &requests {
                if state.permits(*next) {
                    state = *next;
                }
            }
            prop_assert_eq!(state, terminal);
        }
    }
}
