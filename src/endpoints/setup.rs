use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;

use crate::error::Result;
use crate::services::setup::SetupSnapshot;
use crate::state::AppState;

/// Entry screen of the setup flow
pub fn entry_routes(state: AppState) -> Router {
    let path = state.setup.setup_path.clone();
    Router::new()
        .route(&path, get(setup_entry))
        .with_state(state)
}

pub fn setup_routes(state: AppState) -> Router {
    Router::new()
        .route("/required", get(check_setup_required))
        .route("/status", get(get_setup_status))
        .route("/run", post(start_setup))
        .route("/ws", get(setup_ws_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct SetupRequiredResponse {
    setup_required: bool,
}

#[derive(Debug, Serialize)]
struct SetupStartResponse {
    message: String,
    started: bool,
}

/// Setup screen: leaves for the dashboard when setup already happened
async fn setup_entry(State(state): State<AppState>) -> Response {
    if state.prober.probe().await.is_ready() {
        return Redirect::to(&state.setup.dashboard_path).into_response();
    }

    Json(state.orchestrator.run_state().snapshot()).into_response()
}

/// Check if setup is required
async fn check_setup_required(State(state): State<AppState>) -> Json<SetupRequiredResponse> {
    let status = state.prober.probe().await;

    Json(SetupRequiredResponse {
        setup_required: !status.is_ready(),
    })
}

/// Current run state with the step catalog
async fn get_setup_status(State(state): State<AppState>) -> Json<SetupSnapshot> {
    Json(state.orchestrator.run_state().snapshot())
}

fn not_started(message: &str) -> Json<SetupStartResponse> {
    Json(SetupStartResponse {
        message: message.to_string(),
        started: false,
    })
}

/// Start a setup run in the background
///
/// `started` is true only for the request whose run claimed the running flag.
async fn start_setup(State(state): State<AppState>) -> Result<Json<SetupStartResponse>> {
    if state.orchestrator.is_running() {
        return Ok(not_started("Setup already running"));
    }

    if state.prober.probe().await.is_ready() {
        return Ok(not_started("Setup already complete"));
    }

    if state.orchestrator.start().is_none() {
        return Ok(not_started("Setup already running"));
    }

    Ok(Json(SetupStartResponse {
        message: "Setup started".to_string(),
        started: true,
    }))
}

/// WebSocket handler for setup progress updates
async fn setup_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    tracing::info!("Setup WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_setup_socket(socket, state))
}

/// Handle setup WebSocket connection
async fn handle_setup_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so no event falls in between
    let mut rx = state.orchestrator.subscribe();

    tracing::info!(
        "New WebSocket client connected for setup updates, subscribers: {}",
        state.setup_tx.receiver_count()
    );

    let initial_status = serde_json::json!({
        "type": "initial_status",
        "status": state.orchestrator.run_state().snapshot(),
    });
    if let Ok(json) = serde_json::to_string(&initial_status) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Forward broadcast messages to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages (ping/pong, close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!("WebSocket client requested close");
                    break;
                }
                Err(e) => {
                    tracing::debug!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Stop the other task once either side ends
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!("Setup WebSocket client disconnected");
}
