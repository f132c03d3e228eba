//! Cross-user administration endpoints (`/api/admin/*`).
//!
//! Every handler takes [`AdminAuth`], which rejects requests whose bearer
//! token does not match the configured admin secret.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Query, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

use brain_core::{AdminItemsQuery, AdminStats, ItemsPage, UserActivityPage};

use super::{non_blank, page_bounds, parse_content_type, parse_item_id};
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for admin listings.
pub const ADMIN_DEFAULT_LIMIT: i64 = 50;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_DIGEST_LABEL: &[u8] = b"brain-admin-token";

/// Compare a presented token with the admin secret in constant time.
///
/// Both sides are reduced to fixed-length MACs first, so neither the
/// content nor the length of the secret leaks through timing.
pub(crate) fn token_matches(token: &str, secret: &str) -> bool {
    if token.is_empty() || secret.is_empty() {
        return false;
    }
    let (Ok(mut expected), Ok(mut presented)) = (
        HmacSha256::new_from_slice(secret.as_bytes()),
        HmacSha256::new_from_slice(token.as_bytes()),
    ) else {
        return false;
    };
    expected.update(TOKEN_DIGEST_LABEL);
    presented.update(TOKEN_DIGEST_LABEL);
    presented
        .verify_slice(&expected.finalize().into_bytes())
        .is_ok()
}

/// Proof that the request carried the admin bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.admin_secret.as_deref() else {
            return Err(ApiError::Unauthorized("Unauthorized".into()));
        };

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim);

        match token {
            Some(token) if token_matches(token, secret) => Ok(AdminAuth),
            _ => Err(ApiError::Unauthorized("Unauthorized".into())),
        }
    }
}

/// GET /api/admin/stats
pub async fn stats(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.admin.stats(Utc::now()).await?))
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/users
pub async fn users(
    _auth: AdminAuth,
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<UserActivityPage>, ApiError> {
    let Query(params) = params?;
    let (limit, offset) = page_bounds(params.limit, params.offset, ADMIN_DEFAULT_LIMIT)?;
    Ok(Json(state.admin.user_activity(limit, offset).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminItemsParams {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub user_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/items
pub async fn items(
    _auth: AdminAuth,
    State(state): State<AppState>,
    params: Result<Query<AdminItemsParams>, QueryRejection>,
) -> Result<Json<ItemsPage>, ApiError> {
    let Query(params) = params?;
    let (limit, offset) = page_bounds(params.limit, params.offset, ADMIN_DEFAULT_LIMIT)?;

    let query = AdminItemsQuery {
        content_type: parse_content_type(params.content_type.as_deref())?,
        user_id: non_blank(params.user_id),
        search: non_blank(params.search),
        limit,
        offset,
    };

    Ok(Json(state.admin.list_all_items(query).await?))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteBody {
    #[serde(default)]
    pub ids: Option<Vec<String>>,
}

/// DELETE /api/admin/items
///
/// Deletes regardless of owner, then removes stored images best-effort.
pub async fn delete_items(
    _auth: AdminAuth,
    State(state): State<AppState>,
    body: Result<Json<BulkDeleteBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let raw_ids = body.ids.unwrap_or_default();
    if raw_ids.is_empty() {
        return Err(ApiError::BadRequest("ids array is required".into()));
    }

    let ids = raw_ids
        .iter()
        .map(|id| parse_item_id(id))
        .collect::<Result<Vec<Uuid>, _>>()?;

    let image_urls = state.admin.delete_items(&ids).await?;
    let deleted = image_urls.len();

    for url in image_urls.iter().flatten() {
        state.pipeline.images().delete_image_best_effort(url).await;
    }

    info!(
        subsystem = "api",
        component = "admin",
        op = "delete_items",
        requested = ids.len(),
        deleted,
        "Admin bulk delete completed"
    );

    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cre", "s3cret"));
        assert!(!token_matches("s3cret-longer", "s3cret"));
        assert!(!token_matches("S3CRET", "s3cret"));
        assert!(!token_matches("", "s3cret"));
        assert!(!token_matches("", ""));
    }
}
