//! Protected application entry.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::Result;
use crate::models::site_setting;
use crate::services::database_setup;
use crate::state::AppState;

pub fn dashboard_routes(state: AppState) -> Router {
    let path = state.setup.dashboard_path.clone();
    Router::new()
        .route(&path, get(get_dashboard))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    site_settings: Option<site_setting::Model>,
}

/// Dashboard landing data
async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>> {
    let db = state.get_db().await?;
    let site_settings = database_setup::get_site_settings(&db).await?;

    Ok(Json(DashboardResponse { site_settings }))
}
