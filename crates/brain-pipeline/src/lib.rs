//! # brain-pipeline
//!
//! Turns inbound chat messages and API submissions into stored items.
//!
//! This crate provides:
//! - LINE Messaging API client and webhook signature verification
//! - Open Graph link preview fetching
//! - Supabase object storage and the chat image handler
//! - The webhook orchestrator and background enrichment
//! - In-memory fakes for tests (feature `mock`)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use brain_pipeline::{LineClient, LineConfig, LinkPreviewFetcher, Pipeline};
//! use brain_pipeline::{SupabaseStorage, SupabaseStorageConfig};
//!
//! let pipeline = Pipeline::new(
//!     Arc::new(db.items.clone()),
//!     Arc::new(LineClient::new(LineConfig::new(token))?),
//!     Arc::new(SupabaseStorage::new(SupabaseStorageConfig::new(url, key))?),
//!     LinkPreviewFetcher::new()?,
//! )
//! .with_summarizer(summarizer);
//!
//! // Acknowledge first, process on a detached task
//! pipeline.spawn_delivery(body);
//! ```

pub mod image;
pub mod line;
pub mod link_preview;
pub mod pipeline;
pub mod storage;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use brain_core::*;

pub use image::{extension_for, ImageHandler};
pub use line::{
    saved_reply, sign_body, verify_signature, LineClient, LineConfig, MessagingClient,
    FAILURE_REPLY, SIGNATURE_HEADER, UNSUPPORTED_REPLY,
};
pub use link_preview::{decode_html_entities, to_preview, LinkPreviewFetcher};
pub use pipeline::{enrich_item, enrichment_update, EventOutcome, IngestOverrides, Pipeline};
pub use storage::{ObjectStorage, SupabaseStorage, SupabaseStorageConfig};
