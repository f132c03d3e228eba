//! # brain-core
//!
//! Core types, traits, and pure text logic for the second-brain service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other brain crates depend on.

pub mod category;
pub mod error;
pub mod extract;
pub mod models;
pub mod parser;
pub mod traits;

// Re-export commonly used types at crate root
pub use category::{detect_category, is_suggested_category};
pub use error::{Error, Result};
pub use extract::{extract_hashtags, extract_urls, is_valid_url, merge_tags, normalize_content};
pub use models::*;
pub use parser::{generate_title, parse_image_message, parse_message, parse_text_message};
pub use traits::*;
