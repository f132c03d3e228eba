//! Anthropic Messages API inference backend.
//!
//! # Example
//!
//! ```rust,no_run
//! use brain_inference::anthropic::{AnthropicBackend, AnthropicConfig};
//! use brain_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = AnthropicBackend::new(AnthropicConfig {
//!         api_key: Some("sk-ant-...".to_string()),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     let reply = backend
//!         .generate_with_system("Answer in one word.", "Capital of Thailand?")
//!         .await
//!         .unwrap();
//!     println!("{}", reply);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{
    AnthropicBackend, AnthropicConfig, ANTHROPIC_VERSION, DEFAULT_ANTHROPIC_URL,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
pub use error::{to_brain_error, AnthropicErrorCode};
pub use types::*;
