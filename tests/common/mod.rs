//! Test helpers shared by the integration tests.
//!
//! Provides in-memory databases, fake role stores and scripted bootstrap clients.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::{broadcast, Notify};

use videopopup::config::setup::SetupConfig;
use videopopup::migrations::Migrator;
use videopopup::models::{profile, user_role};
use videopopup::services::setup::{
    BootstrapClient, ProbeError, RemoteStep, RoleStore, SetupOrchestrator, StepFailure, StepReply,
};
use videopopup::state::AppState;

// ============================================================================
// Databases
// ============================================================================

/// Create an empty in-memory SQLite database (no schema)
pub async fn create_test_db() -> DatabaseConnection {
    Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

/// Create an in-memory SQLite database with the schema applied
pub async fn create_migrated_db() -> DatabaseConnection {
    let db = create_test_db().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");
    db
}

/// Insert a profile and return its id
pub async fn create_profile(db: &DatabaseConnection, email: &str) -> String {
    let now = chrono::Utc::now();
    let id = uuid::Uuid::new_v4().to_string();
    profile::ActiveModel {
        id: Set(id.clone()),
        email: Set(email.to_string()),
        full_name: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to create profile");
    id
}

/// Assign a role to a user id
pub async fn assign_role(db: &DatabaseConnection, user_id: &str, role: &str) {
    user_role::ActiveModel {
        user_id: Set(user_id.to_string()),
        role: Set(role.to_string()),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to assign role");
}

/// Insert a profile carrying the admin role
pub async fn create_admin(db: &DatabaseConnection, email: &str) -> String {
    let id = create_profile(db, email).await;
    assign_role(db, &id, "admin").await;
    id
}

// ============================================================================
// Configuration and state
// ============================================================================

pub fn setup_config(redirect_delay: Duration) -> SetupConfig {
    SetupConfig {
        redirect_delay,
        ..SetupConfig::default()
    }
}

/// App state over a local database with an always-succeeding bootstrap client
pub fn build_app_state(db: Option<DatabaseConnection>) -> AppState {
    AppState::new(
        db,
        Arc::new(ScriptedClient::succeeding()),
        setup_config(Duration::ZERO),
    )
}

pub fn orchestrator(client: Arc<dyn BootstrapClient>, delay: Duration) -> SetupOrchestrator {
    let (tx, _) = broadcast::channel(64);
    SetupOrchestrator::new(client, tx, &setup_config(delay))
}

/// Drain every message currently buffered on a receiver
pub fn drain_events(rx: &mut broadcast::Receiver<String>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        events.push(serde_json::from_str(&msg).expect("event is JSON"));
    }
    events
}

// ============================================================================
// Fake role store
// ============================================================================

type TableRead = Box<dyn Fn() -> Result<(), ProbeError> + Send + Sync>;
type AdminRead = Box<dyn Fn() -> Result<usize, ProbeError> + Send + Sync>;

/// Role store with canned answers; counts how often each read runs
pub struct FakeRoleStore {
    table: TableRead,
    admins: AdminRead,
    pub table_reads: AtomicUsize,
    pub admin_reads: AtomicUsize,
}

impl FakeRoleStore {
    fn new(table: TableRead, admins: AdminRead) -> Self {
        Self {
            table,
            admins,
            table_reads: AtomicUsize::new(0),
            admin_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_admins(count: usize) -> Self {
        Self::new(Box::new(|| Ok(())), Box::new(move || Ok(count)))
    }

    pub fn missing_table() -> Self {
        Self::new(
            Box::new(|| Err(ProbeError::TableUnavailable)),
            Box::new(|| Ok(1)),
        )
    }

    pub fn network_error() -> Self {
        Self::new(
            Box::new(|| Err(ProbeError::Transport("connection reset by peer".to_string()))),
            Box::new(|| Err(ProbeError::Transport("connection reset by peer".to_string()))),
        )
    }

    pub fn permission_denied() -> Self {
        Self::new(
            Box::new(|| Err(ProbeError::Rejected { status: 401 })),
            Box::new(|| Ok(1)),
        )
    }

    pub fn admin_read_fails() -> Self {
        Self::new(
            Box::new(|| Ok(())),
            Box::new(|| Err(ProbeError::Database("no such column: role".to_string()))),
        )
    }

    pub fn total_reads(&self) -> usize {
        self.table_reads.load(Ordering::SeqCst) + self.admin_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for FakeRoleStore {
    async fn table_accessible(&self) -> Result<(), ProbeError> {
        self.table_reads.fetch_add(1, Ordering::SeqCst);
        (self.table)()
    }

    async fn admin_rows(&self, limit: u64) -> Result<usize, ProbeError> {
        self.admin_reads.fetch_add(1, Ordering::SeqCst);
        (self.admins)().map(|n| n.min(limit as usize))
    }
}

// ============================================================================
// Scripted bootstrap client
// ============================================================================

/// Bootstrap client that fails the configured steps and records every call
#[derive(Default)]
pub struct ScriptedClient {
    failures: Mutex<HashMap<RemoteStep, StepFailure>>,
    calls: Mutex<Vec<RemoteStep>>,
    gate: Option<(RemoteStep, Arc<Notify>)>,
}

impl ScriptedClient {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(step: RemoteStep, failure: StepFailure) -> Self {
        let client = Self::default();
        client.fail(step, failure);
        client
    }

    /// Block `step` until the returned notifier fires
    pub fn gated(step: RemoteStep) -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        let client = Self {
            gate: Some((step, notify.clone())),
            ..Self::default()
        };
        (client, notify)
    }

    pub fn fail(&self, step: RemoteStep, failure: StepFailure) {
        self.failures.lock().insert(step, failure);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn calls(&self) -> Vec<RemoteStep> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BootstrapClient for ScriptedClient {
    async fn run_step(&self, step: RemoteStep) -> Result<StepReply, StepFailure> {
        self.calls.lock().push(step);

        if let Some((gated, notify)) = &self.gate {
            if *gated == step {
                notify.notified().await;
            }
        }

        let failure = self.failures.lock().get(&step).cloned();
        match failure {
            Some(f) => Err(f),
            None => Ok(StepReply {
                success: true,
                message: Some(format!("{} done", step)),
            }),
        }
    }
}

pub fn rejected(status: u16, message: &str) -> StepFailure {
    StepFailure::Rejected {
        status,
        message: message.to_string(),
    }
}

// ============================================================================
// Local HTTP servers
// ============================================================================

/// Serve a router on an ephemeral local port
pub async fn spawn_server(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    addr
}

/// An address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    addr
}
