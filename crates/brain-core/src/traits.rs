//! Core traits for second-brain abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ITEM REPOSITORY TRAITS
// =============================================================================

/// Owner-scoped storage for brain items.
///
/// Every read, update and delete takes the owner id; a row that exists under
/// another owner behaves exactly like a missing row.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert a new item and return the stored row.
    async fn create_item(&self, req: CreateItemRequest) -> Result<BrainItem>;

    /// Fetch one item, `None` when absent or owned by someone else.
    async fn get_item(&self, id: Uuid, user_id: &str) -> Result<Option<BrainItem>>;

    /// List items matching all supplied filters, newest first.
    async fn get_items(&self, query: ItemsQuery) -> Result<ItemsPage>;

    /// Apply a partial update and refresh `updated_at`.
    ///
    /// Returns `Error::ItemNotFound` when no row matched.
    async fn update_item(&self, id: Uuid, user_id: &str, req: UpdateItemRequest)
        -> Result<BrainItem>;

    /// Delete an item. Returns `Error::ItemNotFound` when no row matched.
    async fn delete_item(&self, id: Uuid, user_id: &str) -> Result<()>;

    /// Distinct tags across the owner's items with usage counts, most used first.
    async fn get_user_tags(&self, user_id: &str) -> Result<Vec<TagCount>>;

    /// Distinct categories across the owner's items with counts, most used first.
    async fn get_user_categories(&self, user_id: &str) -> Result<Vec<CategoryCount>>;
}

/// Cross-user queries for the administration surface.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Aggregate counts relative to `now` (today and the trailing seven days).
    async fn stats(&self, now: DateTime<Utc>) -> Result<AdminStats>;

    /// Per-user roll-up sorted by item count, descending.
    async fn user_activity(&self, limit: i64, offset: i64) -> Result<UserActivityPage>;

    /// Items across all users, newest first.
    async fn list_all_items(&self, query: AdminItemsQuery) -> Result<ItemsPage>;

    /// Delete items by id regardless of owner.
    ///
    /// Returns one entry per deleted row holding its image URL, if any.
    async fn delete_items(&self, ids: &[Uuid]) -> Result<Vec<Option<String>>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
