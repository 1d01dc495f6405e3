use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

// -----------------------------------------------------------------------------
// Config (root)
// -----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

impl Config {
    /// Load from a YAML file. A missing file means defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path);
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        serde_saphyr::from_str(&contents).map_err(ConfigError::Yaml)
    }
}

// -----------------------------------------------------------------------------
// ServerConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Sessions idle longer than this are swept.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Cap on concurrent chat connections.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    256
}

// -----------------------------------------------------------------------------
// ModelConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_seconds: default_model_timeout(),
        }
    }
}

fn default_model_name() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model_timeout() -> u64 {
    60
}

// -----------------------------------------------------------------------------
// TurnConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TurnConfig {
    /// Model/tool round trips allowed per user message.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_seconds: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_timeout_seconds: default_tool_timeout(),
        }
    }
}

fn default_max_iterations() -> u32 {
    6
}

fn default_tool_timeout() -> u64 {
    30
}

// -----------------------------------------------------------------------------
// BookingConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BookingConfig {
    /// Attempts per search call before giving up.
    #[serde(default = "default_search_retries")]
    pub search_retries: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: u64,
    /// Sentence injected into the system prompt describing how the agent
    /// must collect confirmation before booking.
    #[serde(default = "default_confirmation_policy")]
    pub confirmation_policy: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            search_retries: default_search_retries(),
            backoff_base_seconds: default_backoff_base(),
            confirmation_policy: default_confirmation_policy(),
        }
    }
}

fn default_search_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1
}

fn default_confirmation_policy() -> String {
    "Before booking anything, summarize the full itinerary with prices and ask \
     the user for an explicit yes. Only call confirm_booking after that yes."
        .to_string()
}

// -----------------------------------------------------------------------------
// ConfigError
// -----------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
