//! # brain-inference
//!
//! Text-generation backends and AI enrichment for the second-brain service.
//!
//! This crate provides:
//! - Anthropic Messages API backend implementing `GenerationBackend`
//! - The summarizer that turns model output into summaries, tags and categories
//! - A mock backend for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use brain_inference::{AnthropicBackend, AnthropicConfig, Summarizer, SummaryRequest};
//! use brain_core::ContentType;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = AnthropicBackend::new(AnthropicConfig::from_env()).unwrap();
//!     let summarizer = Summarizer::new(Arc::new(backend));
//!     let result = summarizer
//!         .summarize(&SummaryRequest {
//!             content: "Meeting notes for the Q3 roadmap".to_string(),
//!             content_type: ContentType::Text,
//!             title: None,
//!             link_preview: None,
//!         })
//!         .await;
//!     println!("{}", result.summary);
//! }
//! ```

pub mod anthropic;
pub mod summarizer;

// Mock generation backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use brain_core::*;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use summarizer::{
    build_summary_prompt, extract_json_object, is_ai_available, Summarizer, SummaryRequest,
    SummaryResponse, TaggingRequest, TaggingResponse,
};
