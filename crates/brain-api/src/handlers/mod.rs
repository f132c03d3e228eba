//! HTTP handlers for brain-api.

pub mod admin;
pub mod health;
pub mod items;
pub mod search;
pub mod tags;
pub mod webhook;

use std::str::FromStr;

use uuid::Uuid;

use brain_core::ContentType;

use crate::error::ApiError;

/// Largest page a client may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Owner id from a query or body field.
pub(crate) fn require_user(user_id: Option<String>) -> Result<String, ApiError> {
    user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("userId is required".into()))
}

/// Optional `type` filter. Blank means no filter.
pub(crate) fn parse_content_type(raw: Option<&str>) -> Result<Option<ContentType>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(ContentType::from_str(s)?)),
        None => Ok(None),
    }
}

/// Validate paging parameters, capping the limit.
pub(crate) fn page_bounds(
    limit: Option<i64>,
    offset: Option<i64>,
    default_limit: i64,
) -> Result<(i64, i64), ApiError> {
    let limit = limit.unwrap_or(default_limit);
    if limit < 1 {
        return Err(ApiError::BadRequest("limit must be >= 1".into()));
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::BadRequest("offset must be >= 0".into()));
    }
    Ok((limit.min(MAX_PAGE_LIMIT), offset))
}

pub(crate) fn parse_item_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid item id '{}'", raw)))
}

/// Non-blank optional string.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
