//! In-memory collaborators for tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brain_pipeline::mock::{MemoryItemRepository, MemoryObjectStorage, RecordingMessenger};
//!
//! let items = Arc::new(MemoryItemRepository::new());
//! let messenger = Arc::new(RecordingMessenger::new().with_content("image/png", b"png".to_vec()));
//! let storage = Arc::new(MemoryObjectStorage::new());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use brain_core::{
    merge_tags, AdminItemsQuery, AdminRepository, AdminStats, BrainItem, CategoryCount,
    ContentType, CreateItemRequest, Error, ItemRepository, ItemsPage, ItemsQuery, Result,
    StatsOverview, TagCount, TypeCounts, UpdateItemRequest, UserActivity, UserActivityPage,
};

use crate::line::MessagingClient;
use crate::storage::{public_path, ObjectStorage, DEFAULT_BUCKET};

const TOP_TAGS: usize = 10;
const TOP_CATEGORIES: usize = 5;

// =============================================================================
// ITEM REPOSITORY
// =============================================================================

/// Item store kept in a vector, newest last.
#[derive(Clone, Default)]
pub struct MemoryItemRepository {
    items: Arc<Mutex<Vec<BrainItem>>>,
}

impl MemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored item, oldest first.
    pub fn all(&self) -> Vec<BrainItem> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a fully formed item, e.g. with a chosen timestamp.
    pub fn insert(&self, item: BrainItem) {
        if let Ok(mut items) = self.items.lock() {
            items.push(item);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<BrainItem>>> {
        self.items
            .lock()
            .map_err(|_| Error::Internal("memory repository lock poisoned".to_string()))
    }
}

fn matches_search(item: &BrainItem, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    item.content.to_lowercase().contains(&needle)
        || item
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&needle))
}

/// Newest first, then page.
fn page(mut matched: Vec<BrainItem>, limit: i64, offset: i64) -> ItemsPage {
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let total = matched.len() as i64;
    let items = matched
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    ItemsPage::new(items, total, limit, offset)
}

fn counted<K: Ord>(counts: BTreeMap<K, i64>) -> Vec<(K, i64)> {
    let mut counted: Vec<(K, i64)> = counts.into_iter().collect();
    counted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counted
}

fn tag_counts<'a>(items: impl Iterator<Item = &'a BrainItem>) -> Vec<TagCount> {
    let mut counts = BTreeMap::new();
    for tag in items.flat_map(|item| item.tags.iter()) {
        *counts.entry(tag.clone()).or_insert(0) += 1;
    }
    counted(counts)
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect()
}

fn category_counts<'a>(items: impl Iterator<Item = &'a BrainItem>) -> Vec<CategoryCount> {
    let mut counts = BTreeMap::new();
    for category in items.filter_map(|item| item.category.as_ref()) {
        *counts.entry(category.clone()).or_insert(0) += 1;
    }
    counted(counts)
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect()
}

#[async_trait]
impl ItemRepository for MemoryItemRepository {
    async fn create_item(&self, req: CreateItemRequest) -> Result<BrainItem> {
        let req = req.normalized();
        let now = Utc::now();
        let item = BrainItem {
            id: Uuid::now_v7(),
            user_id: req.user_id,
            content_type: req.content_type,
            content: req.content,
            title: req.title,
            tags: merge_tags(req.tags.unwrap_or_default(), Vec::<String>::new()),
            category: req.category,
            ai_summary: None,
            link_url: req.link_url,
            link_preview: req.link_preview,
            image_url: req.image_url,
            thumbnail_url: req.thumbnail_url,
            ocr_text: None,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.push(item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: Uuid, user_id: &str) -> Result<Option<BrainItem>> {
        Ok(self
            .lock()?
            .iter()
            .find(|item| item.id == id && item.user_id == user_id)
            .cloned())
    }

    async fn get_items(&self, query: ItemsQuery) -> Result<ItemsPage> {
        let matched: Vec<BrainItem> = self
            .lock()?
            .iter()
            .filter(|item| item.user_id == query.user_id)
            .filter(|item| query.content_type.map_or(true, |t| item.content_type == t))
            .filter(|item| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |c| item.category.as_deref() == Some(c))
            })
            .filter(|item| {
                query
                    .tags
                    .as_ref()
                    .filter(|tags| !tags.is_empty())
                    .map_or(true, |tags| item.tags.iter().any(|t| tags.contains(t)))
            })
            .filter(|item| {
                query
                    .search
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .map_or(true, |s| {
                        s.split_whitespace().all(|word| matches_search(item, word))
                    })
            })
            .cloned()
            .collect();
        Ok(page(matched, query.limit, query.offset))
    }

    async fn update_item(
        &self,
        id: Uuid,
        user_id: &str,
        req: UpdateItemRequest,
    ) -> Result<BrainItem> {
        let mut items = self.lock()?;
        let item = items
            .iter_mut()
            .find(|item| item.id == id && item.user_id == user_id)
            .ok_or(Error::ItemNotFound(id))?;

        if let Some(title) = req.title {
            item.title = Some(title);
        }
        if let Some(tags) = req.tags {
            item.tags = merge_tags(tags, Vec::<String>::new());
        }
        if let Some(category) = req.category {
            item.category = Some(category);
        }
        if let Some(summary) = req.ai_summary {
            item.ai_summary = Some(summary);
        }
        if let Some(preview) = req.link_preview {
            if item.content_type == ContentType::Link {
                item.link_preview = Some(preview);
            }
        }
        if let Some(ocr) = req.ocr_text {
            item.ocr_text = Some(ocr);
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete_item(&self, id: Uuid, user_id: &str) -> Result<()> {
        let mut items = self.lock()?;
        let before = items.len();
        items.retain(|item| !(item.id == id && item.user_id == user_id));
        if items.len() == before {
            return Err(Error::ItemNotFound(id));
        }
        Ok(())
    }

    async fn get_user_tags(&self, user_id: &str) -> Result<Vec<TagCount>> {
        let items = self.lock()?;
        Ok(tag_counts(items.iter().filter(|item| item.user_id == user_id)))
    }

    async fn get_user_categories(&self, user_id: &str) -> Result<Vec<CategoryCount>> {
        let items = self.lock()?;
        Ok(category_counts(
            items.iter().filter(|item| item.user_id == user_id),
        ))
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[async_trait]
impl AdminRepository for MemoryItemRepository {
    async fn stats(&self, now: DateTime<Utc>) -> Result<AdminStats> {
        let items = self.lock()?;
        let today = start_of_day(now);
        let week_ago = now - Duration::days(7);

        let mut users: Vec<&str> = items.iter().map(|item| item.user_id.as_str()).collect();
        users.sort_unstable();
        users.dedup();

        let mut by_type = TypeCounts::default();
        for item in items.iter() {
            by_type.add(item.content_type, 1);
        }

        let mut top_tags = tag_counts(items.iter());
        top_tags.truncate(TOP_TAGS);
        let mut top_categories = category_counts(items.iter());
        top_categories.truncate(TOP_CATEGORIES);

        Ok(AdminStats {
            overview: StatsOverview {
                total_items: items.len() as i64,
                total_users: users.len() as i64,
                today_items: items.iter().filter(|i| i.created_at >= today).count() as i64,
                week_items: items.iter().filter(|i| i.created_at >= week_ago).count() as i64,
            },
            by_type,
            top_tags,
            top_categories,
        })
    }

    async fn user_activity(&self, limit: i64, offset: i64) -> Result<UserActivityPage> {
        let items = self.lock()?;
        let mut by_user: HashMap<&str, UserActivity> = HashMap::new();

        for item in items.iter() {
            let entry = by_user
                .entry(item.user_id.as_str())
                .or_insert_with(|| UserActivity {
                    user_id: item.user_id.clone(),
                    item_count: 0,
                    text_count: 0,
                    image_count: 0,
                    link_count: 0,
                    last_active: item.created_at,
                    first_seen: item.created_at,
                });
            entry.item_count += 1;
            match item.content_type {
                ContentType::Text => entry.text_count += 1,
                ContentType::Image => entry.image_count += 1,
                ContentType::Link => entry.link_count += 1,
            }
            entry.last_active = entry.last_active.max(item.created_at);
            entry.first_seen = entry.first_seen.min(item.created_at);
        }

        let mut users: Vec<UserActivity> = by_user.into_values().collect();
        users.sort_by(|a, b| {
            b.item_count
                .cmp(&a.item_count)
                .then(a.user_id.cmp(&b.user_id))
        });
        let total = users.len() as i64;
        let users = users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok(UserActivityPage {
            users,
            total,
            has_more: total > offset + limit,
        })
    }

    async fn list_all_items(&self, query: AdminItemsQuery) -> Result<ItemsPage> {
        let matched: Vec<BrainItem> = self
            .lock()?
            .iter()
            .filter(|item| query.content_type.map_or(true, |t| item.content_type == t))
            .filter(|item| {
                query
                    .user_id
                    .as_deref()
                    .map_or(true, |u| item.user_id == u)
            })
            .filter(|item| {
                query
                    .search
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map_or(true, |s| matches_search(item, s))
            })
            .cloned()
            .collect();
        Ok(page(matched, query.limit, query.offset))
    }

    async fn delete_items(&self, ids: &[Uuid]) -> Result<Vec<Option<String>>> {
        let mut items = self.lock()?;
        let mut removed = Vec::new();
        items.retain(|item| {
            if ids.contains(&item.id) {
                removed.push(item.image_url.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

// =============================================================================
// MESSAGING
// =============================================================================

/// One reply sent through [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub reply_token: String,
    pub text: String,
}

/// Messaging client that records replies and serves fixed image content.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    replies: Arc<Mutex<Vec<SentReply>>>,
    content_type: Option<String>,
    content: Vec<u8>,
    fail_download: bool,
    fail_reply: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content_type: impl Into<String>, content: Vec<u8>) -> Self {
        self.content_type = Some(content_type.into());
        self.content = content;
        self
    }

    /// Serve content without declaring a content type.
    pub fn with_untyped_content(mut self, content: Vec<u8>) -> Self {
        self.content_type = None;
        self.content = content;
        self
    }

    pub fn failing_download(mut self) -> Self {
        self.fail_download = true;
        self
    }

    pub fn failing_reply(mut self) -> Self {
        self.fail_reply = true;
        self
    }

    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessagingClient for RecordingMessenger {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push(SentReply {
                reply_token: reply_token.to_string(),
                text: text.to_string(),
            });
        }
        if self.fail_reply {
            return Err(Error::Messaging("Mock reply failure".to_string()));
        }
        Ok(())
    }

    async fn content_type(&self, _message_id: &str) -> Result<Option<String>> {
        Ok(self.content_type.clone())
    }

    async fn download_content(&self, _message_id: &str) -> Result<Bytes> {
        if self.fail_download {
            return Err(Error::Messaging(
                "Failed to download image: 404 Not Found".to_string(),
            ));
        }
        Ok(Bytes::from(self.content.clone()))
    }
}

// =============================================================================
// OBJECT STORAGE
// =============================================================================

/// Base URL used for public links to [`MemoryObjectStorage`] objects.
pub const MEMORY_STORAGE_URL: &str = "https://storage.test";

/// Object storage held in a map.
#[derive(Clone, Default)]
pub struct MemoryObjectStorage {
    objects: Arc<Mutex<HashMap<String, (Bytes, String)>>>,
    removed: Arc<Mutex<Vec<String>>>,
    fail_upload: bool,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Content type the object at `path` was uploaded with.
    pub fn content_type_of(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .ok()
            .and_then(|o| o.get(path).map(|(_, ct)| ct.clone()))
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        if self.fail_upload {
            return Err(Error::Storage("Failed to upload image: mock failure".to_string()));
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| Error::Internal("memory storage lock poisoned".to_string()))?;
        if objects.contains_key(path) {
            return Err(Error::Storage(format!(
                "Failed to upload image: {} already exists",
                path
            )));
        }
        objects.insert(path.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        if let Ok(mut objects) = self.objects.lock() {
            for path in paths {
                objects.remove(path);
            }
        }
        if let Ok(mut removed) = self.removed.lock() {
            removed.extend(paths.iter().cloned());
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            MEMORY_STORAGE_URL, DEFAULT_BUCKET, path
        )
    }

    fn path_from_public_url(&self, url: &str) -> Option<String> {
        public_path(DEFAULT_BUCKET, url)
    }

    fn bucket(&self) -> &str {
        DEFAULT_BUCKET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(user: &str, content: &str, tags: &[&str]) -> CreateItemRequest {
        CreateItemRequest {
            user_id: user.to_string(),
            content_type: ContentType::Text,
            content: content.to_string(),
            title: None,
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            category: None,
            link_url: None,
            link_preview: None,
            image_url: None,
            thumbnail_url: None,
        }
    }

    #[tokio::test]
    async fn test_owner_scoping_and_tag_overlap() {
        let repo = MemoryItemRepository::new();
        let a = repo.create_item(text("U1", "one", &["x", "x", "y"])).await.unwrap();
        repo.create_item(text("U1", "two", &["z"])).await.unwrap();
        repo.create_item(text("U2", "three", &["x"])).await.unwrap();

        assert_eq!(a.tags, vec!["x", "y"]);
        assert!(repo.get_item(a.id, "U2").await.unwrap().is_none());

        let mut query = ItemsQuery::for_user("U1");
        query.tags = Some(vec!["y".to_string(), "z".to_string()]);
        assert_eq!(repo.get_items(query).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_admin_delete_returns_image_urls() {
        let repo = MemoryItemRepository::new();
        let item = repo.create_item(text("U1", "one", &[])).await.unwrap();
        let removed = repo.delete_items(&[item.id, Uuid::now_v7()]).await.unwrap();
        assert_eq!(removed, vec![None]);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_storage_never_overwrites() {
        let storage = MemoryObjectStorage::new();
        storage.upload("a/b.jpg", Bytes::from_static(b"1"), "image/jpeg").await.unwrap();
        assert!(storage
            .upload("a/b.jpg", Bytes::from_static(b"2"), "image/jpeg")
            .await
            .is_err());
    }
}
