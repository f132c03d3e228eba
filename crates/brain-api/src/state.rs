//! Shared application state.

use std::sync::Arc;

use brain_core::{AdminRepository, ItemRepository};
use brain_db::Database;
use brain_pipeline::Pipeline;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub admin: Arc<dyn AdminRepository>,
    /// Secret used to verify webhook signatures.
    pub channel_secret: Arc<str>,
    /// Bearer token for admin routes. `None` rejects every admin request.
    pub admin_secret: Option<Arc<str>>,
    /// Pinged by the health check when present.
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(
        pipeline: Pipeline,
        admin: Arc<dyn AdminRepository>,
        channel_secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            pipeline,
            admin,
            channel_secret: channel_secret.into(),
            admin_secret: None,
            db: None,
        }
    }

    pub fn with_admin_secret(mut self, secret: Option<String>) -> Self {
        self.admin_secret = secret.map(Into::into);
        self
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn items(&self) -> &Arc<dyn ItemRepository> {
        self.pipeline.items()
    }
}
