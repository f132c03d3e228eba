//! # brain-db
//!
//! PostgreSQL database layer for the second-brain service.
//!
//! This crate provides:
//! - Connection pool management
//! - The owner-scoped item repository (CRUD, filtered listing, full-text search)
//! - Cross-user aggregation queries for the admin dashboard
//!
//! ## Example
//!
//! ```rust,ignore
//! use brain_db::{ContentType, CreateItemRequest, Database, ItemRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/brain").await?;
//!
//!     let item = db.items.create_item(CreateItemRequest {
//!         user_id: "U123".to_string(),
//!         content_type: ContentType::Text,
//!         content: "Hello, world! #greeting".to_string(),
//!         title: Some("Hello, world!".to_string()),
//!         tags: Some(vec!["greeting".to_string()]),
//!         category: None,
//!         link_url: None,
//!         link_preview: None,
//!         image_url: None,
//!         thumbnail_url: None,
//!     }).await?;
//!
//!     println!("Created item: {}", item.id);
//!     Ok(())
//! }
//! ```
pub mod admin;
pub mod items;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use brain_core::*;

pub use admin::PgAdminRepository;
pub use items::PgItemRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Owner-scoped item repository.
    pub items: PgItemRepository,
    /// Cross-user admin queries.
    pub admin: PgAdminRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            items: PgItemRepository::new(pool.clone()),
            admin: PgAdminRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        log_pool_metrics(&self.pool);
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
