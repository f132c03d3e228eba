//! brain-api server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use brain_api::{build_router, with_http_layers, AppConfig, AppState};
use brain_db::{Database, PoolConfig};
use brain_inference::{is_ai_available, AnthropicBackend, Summarizer};
use brain_pipeline::{
    LineClient, LineConfig, LinkPreviewFetcher, Pipeline, SupabaseStorage, SupabaseStorageConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "brain_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "brain_api=debug,brain_pipeline=debug,brain_inference=info,brain_db=info,tower_http=debug"
            .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("brain-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env()?;

    info!("Connecting to database...");
    let db = Database::connect_with_config(
        &config.database.url,
        PoolConfig::new().max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database connected");

    if config.database.run_migrations {
        info!("Running database migrations...");
        db.migrate().await?;
        info!("Database migrations complete");
    }

    let messaging = LineClient::new(LineConfig::new(
        config.line.channel_access_token.clone(),
    ))?;
    let storage = SupabaseStorage::new(
        SupabaseStorageConfig::new(
            config.storage.supabase_url.clone(),
            config.storage.service_key.clone(),
        )
        .with_bucket(config.storage.bucket.clone()),
    )?;
    let previews = LinkPreviewFetcher::new()?;

    let summarizer = if is_ai_available(&config.anthropic) {
        let backend = AnthropicBackend::new(config.anthropic.clone())?;
        info!(
            subsystem = "api",
            model = %config.anthropic.model,
            "AI enrichment enabled"
        );
        Some(Arc::new(Summarizer::new(Arc::new(backend))))
    } else {
        warn!(
            subsystem = "api",
            "ANTHROPIC_API_KEY not set; AI enrichment disabled"
        );
        None
    };

    let pipeline = Pipeline::new(
        Arc::new(db.items.clone()),
        Arc::new(messaging),
        Arc::new(storage),
        previews,
    )
    .with_summarizer(summarizer);

    if config.admin_secret.is_none() {
        warn!(
            subsystem = "api",
            "ADMIN_SECRET not set; admin routes will reject every request"
        );
    }

    let state = AppState::new(
        pipeline,
        Arc::new(db.admin.clone()),
        config.line.channel_secret.clone(),
    )
    .with_admin_secret(config.admin_secret.clone())
    .with_database(db);

    let app = with_http_layers(build_router(state), &config.server.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
