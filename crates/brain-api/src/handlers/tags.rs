//! Tag and category listings, plus on-demand tag suggestion.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use brain_core::{CategoryCount, ContentType, TagCount};
use brain_inference::TaggingRequest;

use super::{non_blank, parse_content_type, require_user};
use crate::error::ApiError;
use crate::handlers::items::OwnerParams;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<TagCount>,
    pub categories: Vec<CategoryCount>,
}

/// GET /api/brain/tags
pub async fn list_tags(
    State(state): State<AppState>,
    params: Result<Query<OwnerParams>, QueryRejection>,
) -> Result<Json<TagsResponse>, ApiError> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;

    let (tags, categories) = futures::try_join!(
        state.items().get_user_tags(&user_id),
        state.items().get_user_categories(&user_id),
    )?;

    Ok(Json(TagsResponse { tags, categories }))
}

#[derive(Debug, Deserialize)]
pub struct SuggestTagsBody {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestTagsResponse {
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// POST /api/brain/tags/suggest
///
/// Returns an empty suggestion when AI enrichment is not configured.
pub async fn suggest_tags(
    State(state): State<AppState>,
    body: Result<Json<SuggestTagsBody>, JsonRejection>,
) -> Result<Json<SuggestTagsResponse>, ApiError> {
    let Json(body) = body?;
    let content =
        non_blank(body.content).ok_or_else(|| ApiError::BadRequest("content is required".into()))?;
    let content_type = parse_content_type(body.content_type.as_deref())?.unwrap_or(ContentType::Text);

    let Some(summarizer) = state.pipeline.summarizer() else {
        return Ok(Json(SuggestTagsResponse {
            tags: Vec::new(),
            category: None,
        }));
    };

    let suggestion = summarizer
        .suggest_tags(&TaggingRequest {
            content,
            content_type,
        })
        .await;

    Ok(Json(SuggestTagsResponse {
        tags: suggestion.tags,
        category: suggestion.category,
    }))
}
