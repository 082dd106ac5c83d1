//! Setup guard middleware for protected routes
//!
//! Probes the role table on every request. Until an admin exists, protected
//! routes answer with a redirect to the setup screen and the handler never runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::services::setup::GuardView;
use crate::state::AppState;

/// Middleware that lets requests through only once setup is complete
///
/// Redirects use `303 See Other` so the guarded URL is replaced rather than
/// revisited on back-navigation.
pub async fn require_setup_complete(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match state.guard.guard(req).await {
        GuardView::Render(req) => next.run(req).await,
        GuardView::Redirect { to, .. } => {
            tracing::debug!("Setup incomplete, redirecting to {}", to);
            Redirect::to(&to).into_response()
        }
        // Requests wait for the probe, so this is unreachable in practice
        GuardView::Loading => Redirect::to(state.guard.setup_path()).into_response(),
    }
}
