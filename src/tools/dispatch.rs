//! Tool dispatcher: validation, the confirmation gate, and batch execution.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::booking::BookingEngine;
use crate::llm::ToolCall;

use super::error::ToolError;
use super::registry::{SideEffect, ToolRegistry, ToolSpec};
use super::ToolCallResult;

/// Routes model tool calls to handlers.
///
/// Dispatch is infallible from the caller's point of view: any failure is
/// folded into the returned `ToolCallResult` so the model sees the error and
/// the turn keeps going.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    /// Bound on read-only tool calls. Mutating tools are bounded by the
    /// engine, which also records the failed transition on expiry.
    call_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, call_timeout: Duration) -> Self {
        Self {
            registry,
            call_timeout,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a single tool call.
    pub async fn dispatch(&self, engine: &BookingEngine, call: &ToolCall) -> ToolCallResult {
        match self.try_dispatch(engine, call).await {
            Ok(payload) => ToolCallResult::ok(call.id.clone(), payload),
            Err(e) => {
                warn!(tool = %call.function.name, call_id = %call.id, kind = e.kind(), error = %e, "Tool call failed");
                ToolCallResult::error(call.id.clone(), &e)
            }
        }
    }

    /// Execute a batch of tool calls from one model response.
    ///
    /// Consecutive read-only calls run concurrently; a mutating call runs
    /// alone, after everything before it has finished. Results come back in
    /// request order regardless.
    pub async fn dispatch_batch(
        &self,
        engine: &BookingEngine,
        calls: &[ToolCall],
    ) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(calls.len());
        let mut read_only: Vec<&ToolCall> = Vec::new();

        for call in calls {
            if self.is_mutating(call) {
                results.extend(self.run_concurrent(engine, &mut read_only).await);
                results.push(self.dispatch(engine, call).await);
            } else {
                read_only.push(call);
            }
        }
        results.extend(self.run_concurrent(engine, &mut read_only).await);

        results
    }

    async fn run_concurrent(
        &self,
        engine: &BookingEngine,
        calls: &mut Vec<&ToolCall>,
    ) -> Vec<ToolCallResult> {
        let batch = std::mem::take(calls);
        join_all(batch.into_iter().map(|call| self.dispatch(engine, call))).await
    }

    /// Unknown tools dispatch alone; they fail identically either way.
    fn is_mutating(&self, call: &ToolCall) -> bool {
        self.registry
            .lookup(&call.function.name)
            .is_none_or(|spec| spec.effect == SideEffect::Mutating)
    }

    async fn try_dispatch(
        &self,
        engine: &BookingEngine,
        call: &ToolCall,
    ) -> Result<serde_json::Value, ToolError> {
        let spec = self
            .registry
            .lookup(&call.function.name)
            .ok_or_else(|| ToolError::UnknownTool(call.function.name.clone()))?;

        let args = validate_arguments(spec, &call.function.arguments)?;

        if spec.effect == SideEffect::Mutating && !engine.mutating_allowed().await {
            return Err(ToolError::NotConfirmed(format!(
                "{} requires explicit user confirmation first",
                spec.name
            )));
        }

        debug!(tool = spec.name, call_id = %call.id, "Dispatching tool call");
        let invoke = spec.handler.call(engine, args);
        if spec.effect == SideEffect::Mutating {
            // No outer deadline: cancelling a mutating call here would drop
            // the provider call mid-flight with the confirmation gate still
            // open. The engine owns that bound and closes the gate itself.
            return invoke.await;
        }
        tokio::time::timeout(self.call_timeout, invoke)
            .await
            .map_err(|_| ToolError::Timeout)?
    }
}

/// Parse and validate a raw arguments string against the tool's schema.
///
/// Unknown keys are ignored so a chatty model does not break dispatch.
fn validate_arguments(spec: &ToolSpec, raw: &str) -> Result<serde_json::Value, ToolError> {
    let value: serde_json::Value = if raw.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(raw)
            .map_err(|e| ToolError::Validation(format!("arguments are not valid JSON: {e}")))?
    };

    let object = value
        .as_object()
        .ok_or_else(|| ToolError::Validation("arguments must be a JSON object".to_string()))?;

    for (name, param) in &spec.params {
        match object.get(*name) {
            Some(v) if param.kind.accepts(v) => {}
            Some(serde_json::Value::Null) | None if !param.required => {}
            Some(v) => {
                return Err(ToolError::Validation(format!(
                    "parameter '{name}' has the wrong type: {v}"
                )));
            }
            None => {
                return Err(ToolError::Validation(format!(
                    "missing required parameter '{name}'"
                )));
            }
        }
    }

    Ok(value)
}
