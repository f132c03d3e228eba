//! # brain-api
//!
//! HTTP surface of the second-brain service: the LINE webhook, the item
//! API used by the web front end, and the admin endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method, Request};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;

use handlers::{admin, health, items, search, tags, webhook};

/// Maximum accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Generates UUIDv7 request ids so log lines sort by time.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(request_id))
    }
}

/// All application routes, without HTTP middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/webhook",
            post(webhook::receive_webhook).get(webhook::webhook_status),
        )
        .route(
            "/api/brain/items",
            get(items::list_items).post(items::create_item),
        )
        .route(
            "/api/brain/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/api/brain/search", get(search::search_items))
        .route("/api/brain/tags", get(tags::list_tags))
        .route("/api/brain/tags/suggest", post(tags::suggest_tags))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::users))
        .route(
            "/api/admin/items",
            get(admin::items).delete(admin::delete_items),
        )
        .with_state(state)
}

/// Wrap a router with tracing, request ids, CORS, body limits and panic
/// recovery.
pub fn with_http_layers(router: Router, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    subsystem = "api",
                    component = "cors",
                    origin = %origin,
                    "Ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    router
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
