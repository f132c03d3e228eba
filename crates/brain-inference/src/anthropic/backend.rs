//! Anthropic Messages API backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use brain_core::{Error, GenerationBackend, Result};

use super::error::{to_brain_error, AnthropicErrorCode};
use super::types::*;

/// Default Anthropic API endpoint.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Default response token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Default timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key. `None` disables generation.
    pub api_key: Option<String>,
    /// Model to use for generation.
    pub model: String,
    /// Maximum tokens in each response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ANTHROPIC_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AnthropicConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            base_url: get("ANTHROPIC_BASE_URL").unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()),
            api_key: get("ANTHROPIC_API_KEY"),
            model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: get("ANTHROPIC_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_seconds: get("ANTHROPIC_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// True when an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "anthropic",
            op = "init",
            base_url = %config.base_url,
            model = %config.model,
            max_tokens = config.max_tokens,
            has_api_key = config.has_api_key(),
            "Initializing Anthropic backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    /// Build an authenticated POST request to `endpoint`.
    fn build_request(&self, endpoint: &str, api_key: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);

        self.client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("ANTHROPIC_API_KEY is not configured".to_string()))?;

        let start = Instant::now();
        debug!(
            subsystem = "inference",
            component = "anthropic",
            op = "generate",
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending messages request"
        );

        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: (!system.is_empty()).then(|| system.to_string()),
            messages: vec![Message::user(prompt)],
        };

        let response = self
            .build_request("/messages", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (error_type, message) = match serde_json::from_str::<AnthropicErrorResponse>(&body)
            {
                Ok(parsed) => (parsed.error.error_type, parsed.error.message),
                Err(_) => ("unknown".to_string(), body),
            };
            let code = AnthropicErrorCode::from_response(status.as_u16(), &error_type);
            return Err(to_brain_error(
                code,
                &format!("Anthropic returned {}: {}", status, message),
            ));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let text = result.text();
        debug!(
            subsystem = "inference",
            component = "anthropic",
            op = "generate",
            response_len = text.len(),
            stop_reason = result.stop_reason.as_deref().unwrap_or("unknown"),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
