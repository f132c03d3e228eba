//! Item CRUD handlers (`/api/brain/items`).

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use brain_core::{BrainItem, ItemsPage, ItemsQuery, UpdateItemRequest};
use brain_pipeline::IngestOverrides;

use super::{non_blank, page_bounds, parse_content_type, parse_item_id, require_user};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsParams {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub category: Option<String>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Split a comma-separated tag list, dropping blanks.
pub(crate) fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// GET /api/brain/items
pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<ListItemsParams>, QueryRejection>,
) -> Result<Json<ItemsPage>, ApiError> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;
    let (limit, offset) = page_bounds(params.limit, params.offset, ItemsQuery::DEFAULT_LIMIT)?;

    let query = ItemsQuery {
        user_id,
        content_type: parse_content_type(params.content_type.as_deref())?,
        category: non_blank(params.category),
        tags: params
            .tags
            .as_deref()
            .map(split_tags)
            .filter(|tags| !tags.is_empty()),
        search: non_blank(params.search),
        limit,
        offset,
    };

    Ok(Json(state.items().get_items(query).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemBody {
    pub user_id: Option<String>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

/// POST /api/brain/items
pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<CreateItemBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;

    let (Some(user_id), Some(content)) = (non_blank(body.user_id), non_blank(body.content)) else {
        return Err(ApiError::BadRequest(
            "userId and content are required".into(),
        ));
    };

    let item = state
        .pipeline
        .ingest_text(
            &user_id,
            &content,
            IngestOverrides {
                title: non_blank(body.title),
                tags: body.tags.unwrap_or_default(),
                category: non_blank(body.category),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    pub user_id: Option<String>,
}

/// GET /api/brain/items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<OwnerParams>, QueryRejection>,
) -> Result<Json<BrainItem>, ApiError> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;
    let id = parse_item_id(&id)?;

    state
        .items()
        .get_item(id, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Item not found".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemBody {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    #[serde(rename = "ai_summary", alias = "aiSummary")]
    pub ai_summary: Option<String>,
}

/// PUT /api/brain/items/:id
///
/// Only title, tags, category and summary are editable here.
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateItemBody>, JsonRejection>,
) -> Result<Json<BrainItem>, ApiError> {
    let Json(body) = body?;
    let user_id = require_user(body.user_id)?;
    let id = parse_item_id(&id)?;

    if state.items().get_item(id, &user_id).await?.is_none() {
        return Err(ApiError::NotFound("Item not found".into()));
    }

    let item = state
        .items()
        .update_item(
            id,
            &user_id,
            UpdateItemRequest {
                title: body.title,
                tags: body.tags,
                category: body.category,
                ai_summary: body.ai_summary,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(item))
}

/// DELETE /api/brain/items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<OwnerParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;
    let id = parse_item_id(&id)?;

    state.pipeline.delete_item(id, &user_id).await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_tags(" , ").is_empty());
    }
}
