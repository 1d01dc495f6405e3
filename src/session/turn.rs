//! The turn controller: one user message in, one assistant reply out.
//!
//! Runs the model/tool loop until the model answers in plain text or the
//! iteration cap trips. Tool failures are surfaced to the model through the
//! tool-result channel and never abort the turn; only a model transport
//! failure does.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::booking::BookingEngine;
use crate::llm::{first_message, ChatRequest, LlmError, LlmProvider, Message, Role};
use crate::tools::Dispatcher;

/// Reply sent when the model keeps calling tools past the iteration cap.
const CAP_FALLBACK_REPLY: &str =
    "I wasn't able to finish working on that just now. Nothing has been booked. \
     Could you rephrase the request or try again?";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// What one turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Final assistant text for the user.
    pub reply: String,
    /// Every message generated this turn, in order, ready to append to the
    /// session log: assistant tool-call messages, tool results, final reply.
    pub appended: Vec<Message>,
    pub iterations: u32,
    pub tool_calls: u32,
}

/// Per-turn model overrides from the inbound envelope.
#[derive(Debug, Default, Clone)]
pub struct TurnOverrides {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

pub struct TurnController {
    provider: Arc<dyn LlmProvider>,
    dispatcher: Arc<Dispatcher>,
    model: String,
    temperature: Option<f32>,
    max_iterations: u32,
}

impl TurnController {
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dispatcher: Arc<Dispatcher>,
        model: String,
        temperature: Option<f32>,
        max_iterations: u32,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            model,
            temperature,
            max_iterations,
        }
    }

    /// Run one turn against the given history.
    ///
    /// `history` must already end with the user's message. The caller owns
    /// appending `TurnOutcome::appended` to the session log.
    pub async fn run_turn(
        &self,
        engine: &BookingEngine,
        history: &[Message],
        overrides: &TurnOverrides,
    ) -> Result<TurnOutcome, TurnError> {
        let model = overrides.model.as_deref().unwrap_or(&self.model);
        let temperature = overrides.temperature.or(self.temperature);
        let tools = self.dispatcher.registry().definitions();

        let mut messages = history.to_vec();
        let mut appended = Vec::new();
        let mut tool_calls_total = 0u32;

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest::new(model, messages.clone(), temperature)
                .with_tools(tools.clone());
            let response = self.provider.chat(request).await?;
            let message = first_message(response)?;

            let calls = match &message.tool_calls {
                Some(calls) if !calls.is_empty() => calls.clone(),
                _ => {
                    // Plain text: the turn is done.
                    let reply = message.content_str().to_string();
                    messages.push(message.clone());
                    appended.push(message);
                    debug!(iterations = iteration, tool_calls = tool_calls_total, "Turn complete");
                    return Ok(TurnOutcome {
                        reply,
                        appended,
                        iterations: iteration,
                        tool_calls: tool_calls_total,
                    });
                }
            };

            debug!(iteration, count = calls.len(), "Model requested tool calls");
            tool_calls_total += calls.len() as u32;
            messages.push(message.clone());
            appended.push(message);

            for result in self.dispatcher.dispatch_batch(engine, &calls).await {
                let tool_message = result.to_message();
                messages.push(tool_message.clone());
                appended.push(tool_message);
            }
        }

        // Cap exceeded: degrade to a fixed reply instead of erroring. The
        // tool results so far stay in the log.
        warn!(
            max_iterations = self.max_iterations,
            tool_calls = tool_calls_total,
            "Turn hit the iteration cap"
        );
        let fallback = Message::text(Role::Assistant, CAP_FALLBACK_REPLY);
        appended.push(fallback);
        Ok(TurnOutcome {
            reply: CAP_FALLBACK_REPLY.to_string(),
            appended,
            iterations: self.max_iterations,
            tool_calls: tool_calls_total,
        })
    }
}
