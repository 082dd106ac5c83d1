pub mod dashboard;
pub mod setup;
pub mod setup_database;

use axum::{middleware as axum_middleware, routing::get, Router};

use crate::config::CONFIG;
use crate::middleware::require_setup_complete;
use crate::state::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    api_router(state.clone()).merge(function_router(state))
}

/// Setup screen, setup API and the guarded dashboard
pub fn api_router(state: AppState) -> Router {
    // Public routes (reachable before setup)
    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/system/version", get(get_version))
        .merge(setup::entry_routes(state.clone()))
        .nest("/api/setup", setup::setup_routes(state.clone()));

    // Protected routes (setup must be complete)
    let protected_routes = dashboard::dashboard_routes(state.clone()).layer(
        axum_middleware::from_fn_with_state(state, require_setup_complete),
    );

    public_routes.merge(protected_routes)
}

/// Bootstrap functions; they carry their own CORS policy
pub fn function_router(state: AppState) -> Router {
    Router::new().nest(
        "/functions/v1",
        setup_database::setup_database_routes(state),
    )
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Version info endpoint
async fn get_version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "version": CONFIG.version,
        "commit_hash": CONFIG.commit_hash,
        "build_time": CONFIG.build_time,
    }))
}
