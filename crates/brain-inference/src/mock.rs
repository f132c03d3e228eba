//! Mock generation backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brain_inference::mock::MockGenerationBackend;
//!
//! let backend = MockGenerationBackend::new()
//!     .with_fixed_response(r#"{"summary": "short", "suggestedTags": []}"#);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use brain_core::{Error, GenerationBackend, Result};

/// Mock generation backend that records every call.
#[derive(Clone)]
pub struct MockGenerationBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    responses: HashMap<String, String>,
    default_response: String,
    fail: bool,
}

/// One recorded generation call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: "Mock response".to_string(),
            fail: false,
        }
    }
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `response` to every prompt without a specific mapping.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Reply with `output` when the prompt contains `needle`.
    pub fn with_response_mapping(
        mut self,
        needle: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .responses
            .insert(needle.into(), output.into());
        self
    }

    /// Make every call return an inference error.
    pub fn failing(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail = true;
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    fn log_call(&self, system: &str, prompt: &str) {
        if let Ok(mut calls) = self.call_log.lock() {
            calls.push(MockCall {
                system: system.to_string(),
                prompt: prompt.to_string(),
            });
        }
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.log_call(system, prompt);

        if self.config.fail {
            return Err(Error::Inference("Mock failure".to_string()));
        }

        let response = self
            .config
            .responses
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| self.config.default_response.clone());
        Ok(response)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_response_and_log() {
        let backend = MockGenerationBackend::new().with_fixed_response("fixed");
        assert_eq!(backend.generate("hi").await.unwrap(), "fixed");
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.get_calls()[0].prompt, "hi");
    }

    #[tokio::test]
    async fn test_response_mapping() {
        let backend = MockGenerationBackend::new()
            .with_fixed_response("default")
            .with_response_mapping("recipe", "mapped");
        assert_eq!(backend.generate("a recipe").await.unwrap(), "mapped");
        assert_eq!(backend.generate("other").await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_failing() {
        let backend = MockGenerationBackend::new().failing();
        assert!(backend.generate("x").await.is_err());
        assert_eq!(backend.call_count(), 1);
    }
}
