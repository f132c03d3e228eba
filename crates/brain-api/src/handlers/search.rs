//! Full-text search over one owner's items.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use brain_core::{normalize_content, BrainItem, ItemsQuery};

use super::{page_bounds, parse_content_type, require_user};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub user_id: Option<String>,
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub items: Vec<BrainItem>,
    pub total: i64,
    pub has_more: bool,
}

/// GET /api/brain/search
pub async fn search_items(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;

    let query = params.q.as_deref().map(normalize_content).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Search query is required".into()));
    }

    let (limit, offset) = page_bounds(params.limit, params.offset, ItemsQuery::DEFAULT_LIMIT)?;

    let page = state
        .items()
        .get_items(ItemsQuery {
            content_type: parse_content_type(params.content_type.as_deref())?,
            search: Some(query.clone()),
            limit,
            offset,
            ..ItemsQuery::for_user(user_id)
        })
        .await?;

    Ok(Json(SearchResponse {
        query,
        items: page.items,
        total: page.total,
        has_more: page.has_more,
    }))
}
