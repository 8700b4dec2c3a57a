//! Extraction engine abstraction and the OpenAI chat implementation.
//!
//! The pipeline only needs "prompt in, text out". [`ExtractionEngine`] is
//! that seam; [`OpenAiEngine`] implements it against any endpoint speaking
//! the OpenAI `chat/completions` protocol.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ExtractionConfig;

/// A text-to-text service that answers an extraction prompt.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Model identifier, recorded in run summaries.
    fn model_name(&self) -> &str;

    /// Send one prompt and return the raw response text.
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Engine backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiEngine {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAiEngine {
    /// Build the engine from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key was resolved at config load or the
    /// HTTP client cannot be built.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ExtractionEngine for OpenAiEngine {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(attempt, ?delay, "retrying extraction request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        warn!(%status, "extraction engine returned a retryable error");
                        last_err = Some(anyhow!("engine API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("engine API error {}: {}", status, body_text);
                }
                Err(e) => {
                    warn!(error = %e, "extraction request failed");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("extraction request failed after retries")))
    }
}

/// Pull `choices[0].message.content` out of a chat completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

/// Build the engine selected by configuration.
pub fn create_engine(config: &ExtractionConfig) -> Result<Box<dyn ExtractionEngine>> {
    Ok(Box::new(OpenAiEngine::new(config)?))
}
