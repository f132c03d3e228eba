//! Brain item repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use brain_core::{
    merge_tags, BrainItem, CategoryCount, ContentType, CreateItemRequest, Error, ItemRepository,
    ItemsPage, ItemsQuery, LinkPreview, Result, TagCount, UpdateItemRequest,
};

/// Column list shared by every query that returns full items.
pub(crate) const ITEM_COLUMNS: &str = "id, user_id, type, content, title, tags, category, \
     ai_summary, link_url, link_preview, image_url, thumbnail_url, ocr_text, created_at, updated_at";

/// PostgreSQL implementation of ItemRepository.
#[derive(Clone)]
pub struct PgItemRepository {
    pool: Pool<Postgres>,
}

impl PgItemRepository {
    /// Create a new PgItemRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// =============================================================================
// HELPER FUNCTIONS FOR LIST QUERY BUILDING
// =============================================================================

/// Build the WHERE clause for an owner listing. `$1` is always the owner.
///
/// Returns the clause and the next free parameter index.
fn build_items_where(query: &ItemsQuery) -> (String, usize) {
    let mut clause = String::from("WHERE user_id = $1 ");
    let mut param_idx = 2;

    if query.content_type.is_some() {
        clause.push_str(&format!("AND type = ${} ", param_idx));
        param_idx += 1;
    }
    if query.category.is_some() {
        clause.push_str(&format!("AND category = ${} ", param_idx));
        param_idx += 1;
    }
    if tag_filter(query).is_some() {
        clause.push_str(&format!("AND tags && ${} ", param_idx));
        param_idx += 1;
    }
    if search_filter(query).is_some() {
        clause.push_str(&format!(
            "AND search_vector @@ websearch_to_tsquery('simple', ${}) ",
            param_idx
        ));
        param_idx += 1;
    }

    (clause, param_idx)
}

fn tag_filter(query: &ItemsQuery) -> Option<&Vec<String>> {
    query.tags.as_ref().filter(|tags| !tags.is_empty())
}

fn search_filter(query: &ItemsQuery) -> Option<&str> {
    query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Bind ItemsQuery filter parameters in the order `build_items_where` numbers them.
macro_rules! bind_items_query_params {
    ($query:expr, $req:expr) => {{
        let mut q = $query.bind($req.user_id.clone());
        if let Some(ct) = $req.content_type {
            q = q.bind(ct.as_str());
        }
        if let Some(category) = &$req.category {
            q = q.bind(category.clone());
        }
        if let Some(tags) = tag_filter(&$req) {
            q = q.bind(tags.clone());
        }
        if let Some(search) = search_filter(&$req) {
            q = q.bind(search.to_string());
        }
        q
    }};
}

/// Map a database row to a BrainItem.
pub(crate) fn map_row_to_item(row: PgRow) -> Result<BrainItem> {
    let type_str: String = row.try_get("type")?;
    let content_type: ContentType = type_str.parse()?;
    let link_preview: Option<Json<LinkPreview>> = row.try_get("link_preview")?;

    Ok(BrainItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        content_type,
        content: row.try_get("content")?,
        title: row.try_get("title")?,
        tags: row.try_get("tags")?,
        category: row.try_get("category")?,
        ai_summary: row.try_get("ai_summary")?,
        link_url: row.try_get("link_url")?,
        link_preview: link_preview.map(|Json(p)| p),
        image_url: row.try_get("image_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        ocr_text: row.try_get("ocr_text")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn create_item(&self, req: CreateItemRequest) -> Result<BrainItem> {
        let req = req.normalized();
        let id = Uuid::now_v7();
        let now = Utc::now();
        let tags = merge_tags(req.tags.unwrap_or_default(), Vec::<String>::new());

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO brain_items (
                id, user_id, type, content, title, tags, category,
                link_url, link_preview, image_url, thumbnail_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(&req.user_id)
        .bind(req.content_type.as_str())
        .bind(&req.content)
        .bind(&req.title)
        .bind(&tags)
        .bind(&req.category)
        .bind(&req.link_url)
        .bind(req.link_preview.map(Json))
        .bind(&req.image_url)
        .bind(&req.thumbnail_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "items",
            op = "create",
            item_id = %id,
            content_type = req.content_type.as_str(),
            tag_count = tags.len(),
            "Item created"
        );

        map_row_to_item(row)
    }

    async fn get_item(&self, id: Uuid, user_id: &str) -> Result<Option<BrainItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM brain_items WHERE id = $1 AND user_id = $2",
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(map_row_to_item).transpose()
    }

    async fn get_items(&self, query: ItemsQuery) -> Result<ItemsPage> {
        let (where_clause, param_idx) = build_items_where(&query);

        let count_query = format!("SELECT COUNT(*) FROM brain_items {}", where_clause);
        let total: i64 = {
            let q = sqlx::query_scalar(&count_query);
            let q = bind_items_query_params!(q, query);
            q.fetch_one(&self.pool).await.map_err(Error::Database)?
        };

        let items_query = format!(
            "SELECT {} FROM brain_items {} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            ITEM_COLUMNS,
            where_clause,
            param_idx,
            param_idx + 1
        );
        let rows = {
            let q = sqlx::query(&items_query);
            let q = bind_items_query_params!(q, query);
            q.bind(query.limit)
                .bind(query.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?
        };

        let items = rows
            .into_iter()
            .map(map_row_to_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(ItemsPage::new(items, total, query.limit, query.offset))
    }

    async fn update_item(
        &self,
        id: Uuid,
        user_id: &str,
        req: UpdateItemRequest,
    ) -> Result<BrainItem> {
        let tags = req
            .tags
            .map(|tags| merge_tags(tags, Vec::<String>::new()));

        let row = sqlx::query(&format!(
            r#"
            UPDATE brain_items SET
                title = COALESCE($3, title),
                tags = COALESCE($4, tags),
                category = COALESCE($5, category),
                ai_summary = COALESCE($6, ai_summary),
                link_preview = CASE WHEN type = 'link'
                    THEN COALESCE($7, link_preview) ELSE link_preview END,
                ocr_text = COALESCE($8, ocr_text),
                updated_at = $9
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(&req.title)
        .bind(&tags)
        .bind(&req.category)
        .bind(&req.ai_summary)
        .bind(req.link_preview.map(Json))
        .bind(&req.ocr_text)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => map_row_to_item(row),
            None => Err(Error::ItemNotFound(id)),
        }
    }

    async fn delete_item(&self, id: Uuid, user_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM brain_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id));
        }
        Ok(())
    }

    async fn get_user_tags(&self, user_id: &str) -> Result<Vec<TagCount>> {
        let rows = sqlx::query(
            r#"
            SELECT tag, COUNT(*) AS count
            FROM brain_items, unnest(tags) AS tag
            WHERE user_id = $1
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                Ok(TagCount {
                    tag: row.try_get("tag")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn get_user_categories(&self, user_id: &str) -> Result<Vec<CategoryCount>> {
        let rows = sqlx::query(
            r#"
            SELECT category, COUNT(*) AS count
            FROM brain_items
            WHERE user_id = $1 AND category IS NOT NULL
            GROUP BY category
            ORDER BY count DESC, category ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryCount {
                    category: row.try_get("category")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }
}
