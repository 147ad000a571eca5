//! Paddy Season Planner - Backend Server
//!
//! Season plan scheduling and implementation tracking for paddy farmers:
//! baseline stage and fertilizer calendars, leaf color chart adjustments,
//! field progress and daily remarks.

use axum::{routing::get, Router};
use shared::LccTable;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod error;
mod external;
mod handlers;
mod middleware;
mod routes;
mod services;

pub use config::Config;

use external::{FarmRegistry, FarmRegistryClient, VarietyCatalog, VarietyCatalogClient};
use services::{BlobStore, LocalBlobStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub catalog: Arc<dyn VarietyCatalog>,
    pub farms: Arc<dyn FarmRegistry>,
    pub blobs: Arc<dyn BlobStore>,
    pub lcc_table: Arc<LccTable>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    init_tracing(&config.logging.format);

    tracing::info!("Starting Paddy Season Planner Server");
    tracing::info!("Environment: {}", config.environment);

    let lcc_table = load_lcc_table(config.agronomy.lcc_table_path.as_deref()).await?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let blobs = LocalBlobStore::new(&config.storage.upload_dir);
    blobs.ensure_root().await?;

    let catalog = VarietyCatalogClient::new(
        config.catalog.base_url.clone(),
        config.catalog.timeout_secs,
    )?;
    let farms = FarmRegistryClient::new(
        config.farm_registry.base_url.clone(),
        config.farm_registry.timeout_secs,
    )?;

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        catalog: Arc::new(catalog),
        farms: Arc::new(farms),
        blobs: Arc::new(blobs),
        lcc_table: Arc::new(lcc_table),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Human-readable output by default, one JSON object per line with `json`
fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "psp_server=debug,tower_http=debug,sqlx=warn".into());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// The configured leaf color chart table, or the built-in one
async fn load_lcc_table(path: Option<&str>) -> anyhow::Result<LccTable> {
    let Some(path) = path else {
        tracing::info!("Using built-in leaf color chart table");
        return Ok(LccTable::default());
    };

    let json = tokio::fs::read_to_string(path).await?;
    let table = LccTable::from_json(&json).map_err(anyhow::Error::msg)?;
    tracing::info!(path, windows = table.windows.len(), "Loaded leaf color chart table");
    Ok(table)
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(&state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Paddy Season Planner API v1.0"
}
