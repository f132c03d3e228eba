//! Cross-user aggregation queries for the admin dashboard.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use brain_core::{
    AdminItemsQuery, AdminRepository, AdminStats, CategoryCount, ContentType, Error, ItemsPage,
    Result, StatsOverview, TagCount, TypeCounts, UserActivity, UserActivityPage,
};

use crate::escape_like;
use crate::items::{map_row_to_item, ITEM_COLUMNS};

/// Number of tags reported in the dashboard.
pub const TOP_TAGS_LIMIT: i64 = 10;

/// Number of categories reported in the dashboard.
pub const TOP_CATEGORIES_LIMIT: i64 = 5;

/// PostgreSQL implementation of AdminRepository.
#[derive(Clone)]
pub struct PgAdminRepository {
    pool: Pool<Postgres>,
}

impl PgAdminRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Start of the UTC day containing `now`.
fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

fn build_admin_where(query: &AdminItemsQuery) -> (String, usize) {
    let mut clause = String::from("WHERE TRUE ");
    let mut param_idx = 1;

    if query.content_type.is_some() {
        clause.push_str(&format!("AND type = ${} ", param_idx));
        param_idx += 1;
    }
    if query.user_id.is_some() {
        clause.push_str(&format!("AND user_id = ${} ", param_idx));
        param_idx += 1;
    }
    if admin_search(query).is_some() {
        clause.push_str(&format!(
            "AND (content ILIKE ${0} ESCAPE '\\' OR title ILIKE ${0} ESCAPE '\\') ",
            param_idx
        ));
        param_idx += 1;
    }

    (clause, param_idx)
}

fn admin_search(query: &AdminItemsQuery) -> Option<String> {
    query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}

macro_rules! bind_admin_query_params {
    ($query:expr, $req:expr) => {{
        let mut q = $query;
        if let Some(ct) = $req.content_type {
            q = q.bind(ct.as_str());
        }
        if let Some(user_id) = &$req.user_id {
            q = q.bind(user_id.clone());
        }
        if let Some(pattern) = admin_search(&$req) {
            q = q.bind(pattern);
        }
        q
    }};
}

#[async_trait]
impl AdminRepository for PgAdminRepository {
    async fn stats(&self, now: DateTime<Utc>) -> Result<AdminStats> {
        let overview_row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_items,
                COUNT(DISTINCT user_id) AS total_users,
                COUNT(*) FILTER (WHERE created_at >= $1) AS today_items,
                COUNT(*) FILTER (WHERE created_at >= $2) AS week_items
            FROM brain_items
            "#,
        )
        .bind(start_of_day(now))
        .bind(now - Duration::days(7))
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let overview = StatsOverview {
            total_items: overview_row.try_get("total_items")?,
            total_users: overview_row.try_get("total_users")?,
            today_items: overview_row.try_get("today_items")?,
            week_items: overview_row.try_get("week_items")?,
        };

        let type_rows = sqlx::query("SELECT type, COUNT(*) AS count FROM brain_items GROUP BY type")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut by_type = TypeCounts::default();
        for row in type_rows {
            let type_str: String = row.try_get("type")?;
            let count: i64 = row.try_get("count")?;
            let content_type: ContentType = type_str.parse()?;
            by_type.add(content_type, count);
        }

        let top_tags = sqlx::query(
            r#"
            SELECT tag, COUNT(*) AS count
            FROM brain_items, unnest(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            LIMIT $1
            "#,
        )
        .bind(TOP_TAGS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|row| {
            Ok(TagCount {
                tag: row.try_get("tag")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        let top_categories = sqlx::query(
            r#"
            SELECT category, COUNT(*) AS count
            FROM brain_items
            WHERE category IS NOT NULL
            GROUP BY category
            ORDER BY count DESC, category ASC
            LIMIT $1
            "#,
        )
        .bind(TOP_CATEGORIES_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|row| {
            Ok(CategoryCount {
                category: row.try_get("category")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(AdminStats {
            overview,
            by_type,
            top_tags,
            top_categories,
        })
    }

    async fn user_activity(&self, limit: i64, offset: i64) -> Result<UserActivityPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM brain_items")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let rows = sqlx::query(
            r#"
            SELECT
                user_id,
                COUNT(*) AS item_count,
                COUNT(*) FILTER (WHERE type = 'text') AS text_count,
                COUNT(*) FILTER (WHERE type = 'image') AS image_count,
                COUNT(*) FILTER (WHERE type = 'link') AS link_count,
                MAX(created_at) AS last_active,
                MIN(created_at) AS first_seen
            FROM brain_items
            GROUP BY user_id
            ORDER BY item_count DESC, user_id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let users = rows
            .into_iter()
            .map(|row| {
                Ok(UserActivity {
                    user_id: row.try_get("user_id")?,
                    item_count: row.try_get("item_count")?,
                    text_count: row.try_get("text_count")?,
                    image_count: row.try_get("image_count")?,
                    link_count: row.try_get("link_count")?,
                    last_active: row.try_get("last_active")?,
                    first_seen: row.try_get("first_seen")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(UserActivityPage {
            users,
            total,
            has_more: total > offset + limit,
        })
    }

    async fn list_all_items(&self, query: AdminItemsQuery) -> Result<ItemsPage> {
        let (where_clause, param_idx) = build_admin_where(&query);

        let count_query = format!("SELECT COUNT(*) FROM brain_items {}", where_clause);
        let total: i64 = {
            let q = sqlx::query_scalar(&count_query);
            let q = bind_admin_query_params!(q, query);
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
            let q = bind_admin_query_params!(q, query);
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

    async fn delete_items(&self, ids: &[Uuid]) -> Result<Vec<Option<String>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let image_urls: Vec<Option<String>> =
            sqlx::query_scalar("DELETE FROM brain_items WHERE id = ANY($1) RETURNING image_url")
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(image_urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_of_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 17, 45, 12).unwrap();
        assert_eq!(
            start_of_day(now),
            Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_admin_where_search_escapes_wildcards() {
        let query = AdminItemsQuery {
            search: Some("50%_off".into()),
            ..Default::default()
        };
        let (clause, next) = build_admin_where(&query);
        assert!(clause.contains("content ILIKE $1"));
        assert!(clause.contains("title ILIKE $1"));
        assert_eq!(next, 2);
        assert_eq!(admin_search(&query).unwrap(), "%50\\%\\_off%");
    }

    #[test]
    fn test_admin_where_all_filters() {
        let query = AdminItemsQuery {
            content_type: Some(ContentType::Image),
            user_id: Some("U1".into()),
            search: Some("cat".into()),
            ..Default::default()
        };
        let (clause, next) = build_admin_where(&query);
        assert!(clause.contains("type = $1"));
        assert!(clause.contains("user_id = $2"));
        assert!(clause.contains("ILIKE $3"));
        assert_eq!(next, 4);
    }
}
