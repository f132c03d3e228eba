//! LINE webhook endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, warn};

use brain_core::WebhookBody;
use brain_pipeline::{verify_signature, SIGNATURE_HEADER};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/webhook
///
/// Verifies the signature over the raw body, acknowledges immediately and
/// processes the events on a detached task.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if signature.is_empty() || !verify_signature(&state.channel_secret, &body, signature) {
        warn!(
            subsystem = "api",
            component = "webhook",
            has_signature = !signature.is_empty(),
            "Rejected webhook delivery with invalid signature"
        );
        return Err(ApiError::Unauthorized("Invalid signature".into()));
    }

    let delivery: WebhookBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook body: {}", e)))?;

    debug!(
        subsystem = "api",
        component = "webhook",
        event_count = delivery.events.len(),
        "Webhook delivery accepted"
    );

    state.pipeline.spawn_delivery(delivery);

    Ok(Json(json!({ "success": true })))
}

/// GET /api/webhook
pub async fn webhook_status() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "Second Brain Webhook" }))
}
