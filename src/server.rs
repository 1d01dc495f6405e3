use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::sync::Semaphore;
use tower_http::timeout::TimeoutLayer;

use crate::adapter::TravelApi;
use crate::booking::EngineConfig;
use crate::handlers;
use crate::session::{SessionStore, TurnController};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub turn: Arc<TurnController>,
    /// Provider adapter handed to each new session's booking engine.
    pub adapter: Arc<dyn TravelApi>,
    pub engine_config: EngineConfig,
    pub system_prompt: Arc<String>,
    /// Bounds concurrent chat connections; one permit per socket.
    pub capacity: Arc<Semaphore>,
}

// ============================================================================
// Server Setup
// ============================================================================

pub fn build_app(state: AppState, request_timeout_seconds: u64) -> Router {
    // Chat socket - no request timeout, the connection is long-lived.
    let chat_routes = Router::new()
        .route("/ws/chat", get(handlers::ws_chat))
        .with_state(state.clone());

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_seconds),
        ))
        .merge(chat_routes)
}
