//! Application bootstrapper
//!
//! Handles all initialization and setup for the VideoPopup setup service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, CONFIG};
use crate::db;
use crate::endpoints;
use crate::services::setup::{BootstrapClient, RoleStore};
use crate::services::{HttpBootstrapClient, RestRoleStore};
use crate::state::AppState;

const DB_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Bootstrap and run the application
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting VideoPopup setup service v{}", env!("CARGO_PKG_VERSION"));

    let state = init_services().await?;
    let app = create_app(state);

    serve(app).await
}

/// Initialize tracing/logging
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("videopopup={},tower_http=info", CONFIG.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match CONFIG.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false))
            .init(),
    }
}

/// Initialize all application services
async fn init_services() -> anyhow::Result<AppState> {
    // Try to connect to database (may not be available before setup)
    let conn = init_database().await;

    // No request timeout: setup steps may legitimately run for a long time
    let http = reqwest::Client::builder().build()?;

    let backend = &CONFIG.backend;
    let client: Arc<dyn BootstrapClient> = Arc::new(HttpBootstrapClient::new(
        http.clone(),
        &backend.url,
        backend.api_key().map(str::to_string),
    ));
    tracing::info!("Setup steps will be posted to {}", backend.setup_function_url());

    let state = if backend.hosted {
        tracing::info!("Reading setup status from hosted backend at {}", backend.url);
        let store: Arc<dyn RoleStore> = Arc::new(RestRoleStore::new(
            http,
            &backend.url,
            backend.api_key().map(str::to_string),
        ));
        AppState::with_role_store(
            Arc::new(tokio::sync::RwLock::new(conn)),
            store,
            client,
            CONFIG.setup.clone(),
        )
    } else {
        AppState::new(conn, client, CONFIG.setup.clone())
    };

    if !state.is_db_connected().await {
        spawn_db_reconnect(state.clone());
    }

    Ok(state)
}

/// Initialize the database connection
/// Returns None if database is not available yet
async fn init_database() -> Option<sea_orm::DatabaseConnection> {
    match db::try_connect().await {
        Some(conn) => {
            tracing::info!("Database connection established");
            Some(conn)
        }
        None => {
            tracing::info!("Database not available yet, retrying in the background");
            None
        }
    }
}

/// Keep trying to reach the database until it comes up
fn spawn_db_reconnect(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DB_RECONNECT_INTERVAL);
        while !state.is_db_connected().await {
            interval.tick().await;
            if let Some(conn) = db::try_connect().await {
                tracing::info!("Database connection established");
                state.set_db(conn).await;
            }
        }
    });
}

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    build_app(state, &CONFIG.server.allowed_origins)
}

/// Application router with the API restricted to `allowed_origins`
///
/// The bootstrap function routes are merged after the API CORS layer so they
/// keep their own policy.
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    endpoints::api_router(state.clone())
        .layer(cors_layer(allowed_origins))
        .merge(endpoints::function_router(state))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Start the HTTP server
async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", CONFIG.server.host, CONFIG.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
