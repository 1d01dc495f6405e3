//! The workflow engine: state transitions, search retries, booking dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapter::{Category, Confirmation, Offer, ProviderError, TravelApi, Traveler};

use super::context::BookingContext;
use super::state::WorkflowState;

// ============================================================================
// Configuration
// ============================================================================

/// Retry schedule for read-only provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl RetryPolicy {
    /// Backoff before the next attempt, `attempt` counting from 1.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * self.factor.saturating_pow(attempt.saturating_sub(1))
    }

    /// Total sleep time across a fully exhausted schedule.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.delay(attempt)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    /// Bound on each individual provider call.
    pub call_timeout: Duration,
}

impl EngineConfig {
    /// Worst-case wall time for a fully retried search, with headroom, so an
    /// outer deadline never cuts the retry schedule short.
    #[must_use]
    pub fn search_budget(&self) -> Duration {
        self.call_timeout * self.retry.max_attempts
            + self.retry.total_backoff()
            + self.retry.base_delay
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum BookingError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Search retries exhausted.
    #[error("search unavailable after {attempts} attempts")]
    SearchUnavailable { attempts: u32 },

    /// Provider call exceeded its bound. For the booking path this is an
    /// ambiguous outcome and is never retried automatically.
    #[error("provider call timed out")]
    Timeout,

    /// Operation not legal in the current workflow state.
    #[error("{0}")]
    InvalidState(String),
}

// ============================================================================
// Engine
// ============================================================================

/// Per-session booking workflow engine.
///
/// Owns the `BookingContext` behind a lock so tool handlers can run
/// concurrently within a turn. The context lock is never held across a
/// provider call.
pub struct BookingEngine {
    adapter: Arc<dyn TravelApi>,
    config: EngineConfig,
    ctx: Mutex<BookingContext>,
    /// Confirmed bookings by idempotency key, for short-circuiting repeats.
    confirmations: Mutex<HashMap<String, Confirmation>>,
}

impl BookingEngine {
    #[must_use]
    pub fn new(adapter: Arc<dyn TravelApi>, config: EngineConfig) -> Self {
        Self {
            adapter,
            config,
            ctx: Mutex::new(BookingContext::new()),
            confirmations: Mutex::new(HashMap::new()),
        }
    }

    pub async fn state(&self) -> WorkflowState {
        self.ctx.lock().await.state()
    }

    /// Whether a mutating tool may be dispatched right now.
    ///
    /// `Confirmed` is included so that a repeated booking call can reach the
    /// idempotent replay path instead of bouncing off the gate.
    pub async fn mutating_allowed(&self) -> bool {
        matches!(
            self.ctx.lock().await.state(),
            WorkflowState::BookingInProgress | WorkflowState::Confirmed
        )
    }

    /// Compact context view for tool results and logging.
    pub async fn summary(&self) -> serde_json::Value {
        let ctx = self.ctx.lock().await;
        serde_json::json!({
            "workflow_state": ctx.state().as_str(),
            "required": ctx.required().iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            "selections": ctx
                .selections()
                .iter()
                .map(|(c, id)| (c.as_str().to_string(), id.clone()))
                .collect::<std::collections::BTreeMap<_, _>>(),
            "traveler_set": ctx.traveler().is_some(),
        })
    }

    // ------------------------------------------------------------------------
    // Search (read-only path, retried)
    // ------------------------------------------------------------------------

    /// Run a category search. A search with complete criteria is what moves
    /// the workflow out of `collecting_requirements`; a search after a
    /// terminal state starts a fresh itinerary in the same session.
    pub async fn search(
        &self,
        category: Category,
        criteria: &serde_json::Value,
    ) -> Result<Vec<Offer>, BookingError> {
        {
            let mut ctx = self.ctx.lock().await;
            if ctx.state().is_terminal() {
                info!(category = %category, "Starting a fresh itinerary after terminal state");
                *ctx = BookingContext::new();
            }
            match ctx.state() {
                WorkflowState::CollectingRequirements => {
                    advance(&mut ctx, WorkflowState::Searching)?;
                }
                WorkflowState::Searching
                | WorkflowState::PresentingOptions
                | WorkflowState::AwaitingSelection => {}
                // Adding a requirement here could never be satisfied without
                // a backward edge, so the itinerary must be confirmed or
                // abandoned first.
                state => {
                    return Err(BookingError::InvalidState(format!(
                        "cannot search in state {state}; complete or restart the itinerary"
                    )));
                }
            }
        }

        let offers = self.search_with_retry(category, criteria).await?;

        let mut ctx = self.ctx.lock().await;
        ctx.mark_required(category);
        ctx.store_offers(category, offers.clone());
        if ctx.state() == WorkflowState::Searching {
            advance(&mut ctx, WorkflowState::PresentingOptions)?;
        }

        Ok(offers)
    }

    async fn search_with_retry(
        &self,
        category: Category,
        criteria: &serde_json::Value,
    ) -> Result<Vec<Offer>, BookingError> {
        let policy = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let call = self.adapter.search(category, criteria);
            match tokio::time::timeout(self.config.call_timeout, call).await {
                Ok(Ok(offers)) => return Ok(offers),
                Ok(Err(e)) if !retryable(&e) => return Err(BookingError::Provider(e)),
                Ok(Err(e)) => {
                    warn!(category = %category, attempt, error = %e, "Search attempt failed");
                }
                Err(_) => {
                    warn!(category = %category, attempt, "Search attempt timed out");
                }
            }

            if attempt >= policy.max_attempts {
                return Err(BookingError::SearchUnavailable { attempts: attempt });
            }
            tokio::time::sleep(policy.delay(attempt)).await;
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Record an explicit offer selection. Legal while options are on the
    /// table, including a re-selection while awaiting confirmation.
    pub async fn select_offer(
        &self,
        category: Category,
        offer_id: &str,
    ) -> Result<Offer, BookingError> {
        let mut ctx = self.ctx.lock().await;

        match ctx.state() {
            WorkflowState::PresentingOptions
            | WorkflowState::AwaitingSelection
            | WorkflowState::AwaitingConfirmation => {}
            state => {
                return Err(BookingError::InvalidState(format!(
                    "cannot select an offer in state {state}"
                )));
            }
        }

        let offer = ctx
            .offer(category, offer_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(offer_id.to_string()))?;

        ctx.select(category, offer_id.to_string());
        if ctx.state() == WorkflowState::PresentingOptions {
            advance(&mut ctx, WorkflowState::AwaitingSelection)?;
        }
        maybe_complete_selection(&mut ctx)?;

        Ok(offer)
    }

    /// Store traveler details; may complete the selection phase.
    pub async fn set_traveler(&self, traveler: Traveler) -> Result<WorkflowState, BookingError> {
        let mut ctx = self.ctx.lock().await;
        if ctx.state().is_terminal() {
            return Err(BookingError::InvalidState(
                "itinerary is already finalized".to_string(),
            ));
        }
        ctx.set_traveler(traveler);
        maybe_complete_selection(&mut ctx)?;
        Ok(ctx.state())
    }

    // ------------------------------------------------------------------------
    // Confirmation gate and booking
    // ------------------------------------------------------------------------

    /// The explicit user confirmation signal. The single gate before any
    /// mutating call. A repeat while booking or already booked is a no-op.
    pub async fn confirm(&self) -> Result<WorkflowState, BookingError> {
        let mut ctx = self.ctx.lock().await;
        match ctx.state() {
            WorkflowState::AwaitingConfirmation => {
                advance(&mut ctx, WorkflowState::BookingInProgress)?;
                Ok(WorkflowState::BookingInProgress)
            }
            state @ (WorkflowState::BookingInProgress | WorkflowState::Confirmed) => Ok(state),
            state => Err(BookingError::InvalidState(format!(
                "confirmation is not expected in state {state}"
            ))),
        }
    }

    /// Create the booking with the provider.
    ///
    /// At most one provider call per distinct idempotency key: a repeat with
    /// a previously confirmed key returns the stored confirmation without
    /// touching the provider. Failures and timeouts move to `failed` and are
    /// never retried here; a fresh user confirmation (on a fresh itinerary)
    /// is required to try again.
    pub async fn create_booking(&self) -> Result<Confirmation, BookingError> {
        let (key, offer_ids, traveler, state) = {
            let ctx = self.ctx.lock().await;
            let state = ctx.state();
            if !matches!(
                state,
                WorkflowState::BookingInProgress | WorkflowState::Confirmed
            ) {
                return Err(BookingError::InvalidState(format!(
                    "booking has not been confirmed (state {state})"
                )));
            }
            let key = ctx.idempotency_key().ok_or_else(|| {
                BookingError::InvalidState("itinerary is incomplete".to_string())
            })?;
            let traveler = ctx.traveler().cloned().ok_or_else(|| {
                BookingError::InvalidState("traveler details are missing".to_string())
            })?;
            (key, ctx.selected_offer_ids(), traveler, state)
        };

        // Idempotent replay: duplicate confirmations are a no-op.
        if let Some(existing) = self.confirmations.lock().await.get(&key).cloned() {
            info!(key = %key, reference = %existing.reference, "Replaying stored confirmation");
            return Ok(existing);
        }
        if state == WorkflowState::Confirmed {
            // Confirmed without a stored key would mean the context changed
            // after booking, which the monotonic selection rules prevent.
            return Err(BookingError::InvalidState(
                "booking already finalized".to_string(),
            ));
        }

        let call = self.adapter.create_booking(&offer_ids, &traveler, &key);
        let outcome = tokio::time::timeout(self.config.call_timeout, call).await;

        let mut ctx = self.ctx.lock().await;
        match outcome {
            Ok(Ok(confirmation)) => {
                self.confirmations
                    .lock()
                    .await
                    .insert(key.clone(), confirmation.clone());
                advance(&mut ctx, WorkflowState::Confirmed)?;
                info!(key = %key, reference = %confirmation.reference, "Booking confirmed");
                Ok(confirmation)
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Booking failed");
                advance(&mut ctx, WorkflowState::Failed)?;
                Err(BookingError::Provider(e))
            }
            Err(_) => {
                warn!(key = %key, "Booking call timed out; outcome ambiguous");
                advance(&mut ctx, WorkflowState::Failed)?;
                Err(BookingError::Timeout)
            }
        }
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

fn advance(ctx: &mut BookingContext, next: WorkflowState) -> Result<(), BookingError> {
    let from = ctx.state();
    if !from.permits(next) {
        return Err(BookingError::InvalidState(format!(
            "illegal workflow transition {from} -> {next}"
        )));
    }
    ctx.set_state(next);
    Ok(())
}

fn maybe_complete_selection(ctx: &mut BookingContext) -> Result<(), BookingError> {
    if ctx.state() == WorkflowState::AwaitingSelection
        && ctx.selection_complete()
        && ctx.traveler().is_some()
    {
        advance(ctx, WorkflowState::AwaitingConfirmation)?;
    }
    Ok(())
}

fn retryable(e: &ProviderError) -> bool {
    matches!(e, ProviderError::RateLimited | ProviderError::Unavailable)
}
