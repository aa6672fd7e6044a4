//! Radiodesk Server - radio station equipment inventory
//!
//! REST API server for the station's equipment inventory.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radiodesk_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        storage::{BlobStore, LocalBlobStore},
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("radiodesk_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Radiodesk Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| format!("Failed to create storage directory {}", config.storage.root))?;

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create repository and services
    let repository = Repository::new(pool);
    let storage: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.storage));
    let services = Services::new(repository, &config, storage);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Multipart framing on top of the file itself
    let upload_limit = DefaultBodyLimit::max(state.config.storage.max_upload_bytes + 64 * 1024);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Locations
        .route(
            "/companies",
            get(api::locations::list_companies).post(api::locations::create_company),
        )
        .route(
            "/companies/:id",
            get(api::locations::get_company)
                .put(api::locations::update_company)
                .delete(api::locations::delete_company),
        )
        .route("/companies/:id/dependencies", get(api::locations::company_dependencies))
        .route("/sites", get(api::locations::list_sites).post(api::locations::create_site))
        .route(
            "/sites/:id",
            get(api::locations::get_site)
                .put(api::locations::update_site)
                .delete(api::locations::delete_site),
        )
        .route("/sites/:id/dependencies", get(api::locations::site_dependencies))
        .route("/rooms", get(api::locations::list_rooms).post(api::locations::create_room))
        .route(
            "/rooms/:id",
            get(api::locations::get_room)
                .put(api::locations::update_room)
                .delete(api::locations::delete_room),
        )
        .route("/rooms/:id/dependencies", get(api::locations::room_dependencies))
        // Equipment
        .route(
            "/equipment",
            get(api::equipment::list_equipment).post(api::equipment::create_equipment),
        )
        .route("/equipment/export.csv", get(api::equipment::export_equipment))
        .route("/equipment/subscribe", get(api::subscriptions::subscribe_equipment))
        .route(
            "/equipment/:id",
            get(api::equipment::get_equipment)
                .put(api::equipment::update_equipment)
                .delete(api::equipment::delete_equipment),
        )
        .route("/equipment/:id/archive", post(api::equipment::archive_equipment))
        .route("/equipment/:id/restore", post(api::equipment::restore_equipment))
        .route("/equipment/:id/movements", get(api::equipment::equipment_movements))
        // Documents and photos
        .route(
            "/equipment/:id/documents",
            get(api::documents::list_documents)
                .post(api::documents::upload_document)
                .layer(upload_limit.clone()),
        )
        .route(
            "/equipment/:id/documents/:document_id",
            axum::routing::delete(api::documents::delete_document),
        )
        .route(
            "/equipment/:id/photos",
            post(api::documents::add_photo)
                .delete(api::documents::remove_photo)
                .layer(upload_limit),
        )
        // Movements
        .route(
            "/movements",
            get(api::movements::list_movements).post(api::movements::create_movement),
        )
        .route("/movements/:id", get(api::movements::get_movement))
        .route("/movements/:id/approve", post(api::movements::approve_movement))
        .route("/movements/:id/reject", post(api::movements::reject_movement))
        // Maintenance
        .route(
            "/maintenance",
            get(api::maintenance::list_maintenance).post(api::maintenance::create_maintenance),
        )
        .route(
            "/maintenance/:id",
            get(api::maintenance::get_maintenance)
                .put(api::maintenance::update_maintenance)
                .delete(api::maintenance::delete_maintenance),
        )
        .route("/maintenance/:id/start", post(api::maintenance::start_maintenance))
        .route("/maintenance/:id/complete", post(api::maintenance::complete_maintenance))
        .route("/maintenance/:id/cancel", post(api::maintenance::cancel_maintenance))
        // Settings
        .route(
            "/settings",
            get(api::settings::get_settings).put(api::settings::update_settings),
        )
        .route("/settings/subscribe", get(api::subscriptions::subscribe_settings))
        .route("/settings/reference/next", get(api::settings::preview_reference))
        .route(
            "/settings/options/:list",
            get(api::settings::list_options)
                .put(api::settings::replace_options)
                .post(api::settings::add_option),
        )
        .route(
            "/settings/options/:list/:option_id",
            axum::routing::put(api::settings::update_option).delete(api::settings::deactivate_option),
        )
        // Notifications
        .route(
            "/notifications/subscribe",
            get(api::subscriptions::subscribe_notifications),
        )
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/files", ServeDir::new(&state.config.storage.root))
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
