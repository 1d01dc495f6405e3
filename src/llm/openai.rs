//! OpenAI-compatible chat completion client.
//!
//! Works against OpenAI or any endpoint speaking the same `/chat/completions`
//! protocol. The reqwest client carries the request timeout, so a hung model
//! call surfaces as `LlmError::Request` instead of blocking the turn forever.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::error::LlmError;
use super::provider::LlmProvider;
use super::types::{ChatRequest, ChatResponse};

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Build a provider with a per-request timeout baked into the client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req.json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        Ok(response.json().await?)
    }
}
