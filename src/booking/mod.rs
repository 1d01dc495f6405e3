//! Booking workflow engine.
//!
//! A state machine layered over the conversation that owns the irreversible
//! "create booking" transition. Everything mutating is gated behind an
//! explicit confirmation state plus an idempotency key, so model error, user
//! double-submission, or network retry cannot cause a duplicate purchase.

mod context;
mod engine;
#[cfg(test)]
mod proptests;
mod state;

pub use context::BookingContext;
pub use engine::{BookingEngine, BookingError, EngineConfig, RetryPolicy};
pub use state::WorkflowState;
