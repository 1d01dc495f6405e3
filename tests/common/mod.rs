//! Common test utilities.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use voyagent::adapter::{
    Category, Confirmation, MockTravelApi, Offer, ProviderError, TravelApi, Traveler,
};
use voyagent::booking::{BookingEngine, EngineConfig, RetryPolicy};
use voyagent::llm::{
    ChatRequest, ChatResponse, Choice, FunctionCall, LlmError, LlmProvider, Message, Role,
    ToolCall,
};
use voyagent::session::TurnController;
use voyagent::tools::{travel, Dispatcher};

// ============================================================================
// Scripted Model Provider
// ============================================================================

/// Replays a fixed sequence of model responses, one per chat call.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or(LlmError::EmptyResponse)
    }
}

/// A model that calls the same tool forever.
pub struct RelentlessProvider {
    pub name: String,
    pub arguments: String,
    counter: AtomicU32,
}

impl RelentlessProvider {
    pub fn new(name: &str, arguments: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
            counter: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl LlmProvider for RelentlessProvider {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(tool_call_response(
            &format!("call_{n}"),
            &self.name,
            &self.arguments,
        ))
    }
}

pub fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            message: Message::text(Role::Assistant, content),
            finish_reason: Some("stop".to_string()),
        }],
    }
}

pub fn tool_call_response(id: &str, name: &str, arguments: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            message: Message::assistant_calls(
                None,
                vec![ToolCall {
                    id: id.to_string(),
                    tool_type: "function".to_string(),
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                    },
                }],
            ),
            finish_reason: Some("tool_calls".to_string()),
        }],
    }
}

// ============================================================================
// Counting Adapter
// ============================================================================

/// Wraps the mock provider and counts calls; optionally fails the first N
/// searches with `Unavailable`.
pub struct CountingApi {
    inner: MockTravelApi,
    pub search_calls: AtomicU32,
    pub booking_calls: AtomicU32,
    pub failing_searches: u32,
}

impl CountingApi {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failing_searches: u32) -> Self {
        Self {
            inner: MockTravelApi::new(),
            search_calls: AtomicU32::new(0),
            booking_calls: AtomicU32::new(0),
            failing_searches,
        }
    }

    pub fn searches(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn bookings(&self) -> u32 {
        self.booking_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TravelApi for CountingApi {
    async fn search(
        &self,
        category: Category,
        criteria: &serde_json::Value,
    ) -> Result<Vec<Offer>, ProviderError> {
        let n = self.search_calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failing_searches {
            return Err(ProviderError::Unavailable);
        }
        self.inner.search(category, criteria).await
    }

    async fn create_booking(
        &self,
        offer_ids: &[String],
        traveler: &Traveler,
        idempotency_key: &str,
    ) -> Result<Confirmation, ProviderError> {
        self.booking_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .create_booking(offer_ids, traveler, idempotency_key)
            .await
    }
}

// ============================================================================
// Wiring Helpers
// ============================================================================

pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
        },
        call_timeout: Duration::from_secs(5),
    }
}

pub fn engine_with(adapter: Arc<dyn TravelApi>) -> BookingEngine {
    BookingEngine::new(adapter, fast_engine_config())
}

pub fn controller(provider: Arc<dyn LlmProvider>, max_iterations: u32) -> TurnController {
    let registry = Arc::new(travel::registry().expect("registry builds"));
    let dispatcher = Arc::new(Dispatcher::new(registry, Duration::from_secs(10)));
    TurnController::new(provider, dispatcher, "gpt-4o".to_string(), Some(0.7), max_iterations)
}

pub fn history(user_message: &str) -> Vec<Message> {
    vec![
        Message::text(Role::System, "You are a travel booking assistant."),
        Message::text(Role::User, user_message),
    ]
}
