//! Core data models for the second-brain service.
//!
//! These types are shared across all crates and represent the stored item,
//! the transient parse/preview records, and the inbound LINE webhook payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// ITEM TYPES
// =============================================================================

/// Kind of content an item holds. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Link,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Link => "link",
        }
    }

    /// Emoji used in the chat confirmation for this kind of item.
    pub fn emoji(&self) -> &'static str {
        match self {
            ContentType::Text => "📝",
            ContentType::Image => "🖼️",
            ContentType::Link => "🔗",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "link" => Ok(ContentType::Link),
            other => Err(Error::InvalidInput(format!(
                "Unknown content type '{}': expected text, image or link",
                other
            ))),
        }
    }
}

/// Stored preview of a shared link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreview {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

/// A single stored note belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainItem {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub content: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub ai_summary: Option<String>,
    pub link_url: Option<String>,
    pub link_preview: Option<LinkPreview>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub ocr_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating an item.
#[derive(Debug, Clone)]
pub struct CreateItemRequest {
    pub user_id: String,
    pub content_type: ContentType,
    pub content: String,
    pub title: Option<String>,
    /// Deduplicated by the repository; `None` stores an empty set.
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub link_url: Option<String>,
    pub link_preview: Option<LinkPreview>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl CreateItemRequest {
    /// Drop fields that do not belong to the item's content type.
    ///
    /// Link data is kept only for `link` items and the image URL only for
    /// `image` items.
    pub fn normalized(mut self) -> Self {
        if self.content_type != ContentType::Link {
            self.link_url = None;
            self.link_preview = None;
        }
        if self.content_type != ContentType::Image {
            self.image_url = None;
            self.thumbnail_url = None;
        }
        self
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub ai_summary: Option<String>,
    pub link_preview: Option<LinkPreview>,
    pub ocr_text: Option<String>,
}

impl UpdateItemRequest {
    pub fn is_empty(&self) -> bool {
        self == &UpdateItemRequest::default()
    }
}

/// Filters for listing one owner's items. All filters are AND-ed.
#[derive(Debug, Clone)]
pub struct ItemsQuery {
    pub user_id: String,
    pub content_type: Option<ContentType>,
    pub category: Option<String>,
    /// Matches items whose tag set overlaps this set.
    pub tags: Option<Vec<String>>,
    /// Full-text search over content and title.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ItemsQuery {
    pub const DEFAULT_LIMIT: i64 = 20;

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            content_type: None,
            category: None,
            tags: None,
            search: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of items plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsPage {
    pub items: Vec<BrainItem>,
    pub total: i64,
    pub has_more: bool,
}

impl ItemsPage {
    pub fn new(items: Vec<BrainItem>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            items,
            total,
            has_more: total > offset + limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

// =============================================================================
// ADMIN TYPES
// =============================================================================

/// Filters for the cross-user admin listing.
#[derive(Debug, Clone)]
pub struct AdminItemsQuery {
    pub content_type: Option<ContentType>,
    pub user_id: Option<String>,
    /// Case-insensitive substring match on content or title.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AdminItemsQuery {
    fn default() -> Self {
        Self {
            content_type: None,
            user_id: None,
            search: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_items: i64,
    pub total_users: i64,
    pub today_items: i64,
    pub week_items: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub text: i64,
    pub image: i64,
    pub link: i64,
}

impl TypeCounts {
    pub fn add(&mut self, content_type: ContentType, n: i64) {
        match content_type {
            ContentType::Text => self.text += n,
            ContentType::Image => self.image += n,
            ContentType::Link => self.link += n,
        }
    }
}

/// Aggregate statistics for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub overview: StatsOverview,
    pub by_type: TypeCounts,
    pub top_tags: Vec<TagCount>,
    pub top_categories: Vec<CategoryCount>,
}

/// Per-user activity roll-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    #[serde(rename = "user_id")]
    pub user_id: String,
    pub item_count: i64,
    pub text_count: i64,
    pub image_count: i64,
    pub link_count: i64,
    pub last_active: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityPage {
    pub users: Vec<UserActivity>,
    pub total: i64,
    pub has_more: bool,
}

// =============================================================================
// TRANSIENT PIPELINE TYPES
// =============================================================================

/// Result of classifying one inbound message. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub content_type: ContentType,
    pub content: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub link_url: Option<String>,
    /// Source message id, used to download image content.
    pub message_id: Option<String>,
}

/// Open Graph metadata scraped from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenGraphData {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    /// `og:type`, or the top-level MIME token for non-HTML responses.
    pub og_type: Option<String>,
}

/// Stored image location returned by the upload step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResult {
    pub image_url: String,
    pub size: usize,
}

// =============================================================================
// LINE WEBHOOK PAYLOAD
// =============================================================================

/// Body of a LINE webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    pub source: EventSource,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Declared type of an inbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    File,
    Location,
    Sticker,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
}
