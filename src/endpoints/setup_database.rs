//! `setup-database` function: runs one bootstrap step per request.
//!
//! Replies use the function envelope rather than the API's `{detail}` errors:
//! `{success, message}` on success and `{error}` otherwise.

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::error::AppError;
use crate::services::database_setup::{self, StepOutcome};
use crate::services::setup::RemoteStep;
use crate::state::AppState;

pub fn setup_database_routes(state: AppState) -> Router {
    Router::new()
        .route("/setup-database", post(setup_database))
        .layer(function_cors())
        .with_state(state)
}

/// Callable from any origin, independent of the API's allowed origins
fn function_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
struct SetupDatabaseRequest {
    step: Option<String>,
}

#[derive(Debug, Serialize)]
struct SetupDatabaseResponse {
    success: bool,
    #[serde(flatten)]
    outcome: StepOutcome,
}

/// Error reply of the function
#[derive(Debug)]
pub struct SetupFunctionError {
    status: StatusCode,
    error: String,
}

impl SetupFunctionError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

impl From<AppError> for SetupFunctionError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::ServiceUnavailable(msg) => Self::new(StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Database(e) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for SetupFunctionError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.error })),
        )
            .into_response()
    }
}

/// Run the requested bootstrap step
async fn setup_database(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SetupDatabaseResponse>, SetupFunctionError> {
    let request: SetupDatabaseRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Setup error: {}", e);
        SetupFunctionError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let step = request
        .step
        .as_deref()
        .and_then(RemoteStep::parse)
        .ok_or_else(|| SetupFunctionError::new(StatusCode::BAD_REQUEST, "Invalid step"))?;

    let db = state.get_db().await?;

    tracing::info!("Running setup step '{}'", step);
    let outcome = match step {
        RemoteStep::Migrations => database_setup::run_migrations(&db).await,
        RemoteStep::Admin => database_setup::ensure_admin(&db, &state.setup.admin_email).await,
        RemoteStep::Data => database_setup::seed_data(&db).await,
    }
    .map_err(|e| {
        tracing::error!("Setup step '{}' failed: {}", step, e);
        SetupFunctionError::from(e)
    })?;

    Ok(Json(SetupDatabaseResponse {
        success: true,
        outcome,
    }))
}
