//! HTTP server command implementation.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use voyagent::adapter::{MockTravelApi, TravelApi};
use voyagent::booking::{EngineConfig, RetryPolicy};
use voyagent::config::Config;
use voyagent::llm::OpenAiProvider;
use voyagent::server::{self, AppState};
use voyagent::session::{SessionStore, TurnController};
use voyagent::tools::{travel, Dispatcher};

pub async fn run(
    config_path: &str,
    host_override: Option<IpAddr>,
    port_override: Option<u16>,
) -> Result<()> {
    let mut config = Config::load(config_path)?;

    // CLI overrides config
    if let Some(host) = host_override {
        config.server.host = host.to_string();
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }

    // Model provider
    let api_key = std::env::var(&config.model.api_key_env).ok();
    if api_key.is_none() {
        warn!(env = %config.model.api_key_env, "API key not set; model requests go unauthenticated");
    }
    let provider = Arc::new(OpenAiProvider::new(
        config.model.base_url.clone(),
        api_key,
        Duration::from_secs(config.model.request_timeout_seconds),
    )?);

    // Travel provider adapter
    let adapter: Arc<dyn TravelApi> = Arc::new(MockTravelApi::new());

    let engine_config = EngineConfig {
        retry: RetryPolicy {
            max_attempts: config.booking.search_retries,
            base_delay: Duration::from_secs(config.booking.backoff_base_seconds),
            factor: 2,
        },
        call_timeout: Duration::from_secs(config.turn.tool_timeout_seconds),
    };

    // Tools and dispatch. The dispatch bound must leave room for the full
    // search retry schedule, which the engine runs inside one tool call.
    let registry = Arc::new(travel::registry()?);
    let dispatcher = Arc::new(Dispatcher::new(registry, engine_config.search_budget()));

    let turn = Arc::new(TurnController::new(
        provider,
        dispatcher,
        config.model.name.clone(),
        Some(config.model.temperature),
        config.turn.max_iterations,
    ));

    let sessions = SessionStore::new();
    let state = AppState {
        sessions: sessions.clone(),
        turn,
        adapter,
        engine_config,
        system_prompt: Arc::new(build_system_prompt(&config.booking.confirmation_policy)),
        capacity: Arc::new(Semaphore::new(config.server.max_sessions)),
    };

    // Sweep idle sessions in the background.
    let idle_timeout = Duration::from_secs(config.server.idle_timeout_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions.sweep_idle(idle_timeout);
        }
    });

    let app = server::build_app(state, config.server.request_timeout_seconds);

    let ip: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, model = %config.model.name, "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn build_system_prompt(confirmation_policy: &str) -> String {
    format!(
        "You are a travel booking assistant. You help the user find and book \
         flights, hotels, and rental cars using the tools provided.\n\
         Collect the requirements you need before searching. Present options \
         clearly with offer ids and prices. {confirmation_policy}\n\
         Never invent offers or booking references; only report what the tools \
         return."
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
