use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use sea_orm::DatabaseConnection;

use crate::config::setup::SetupConfig;
use crate::services::setup::{
    BootstrapClient, DbRoleStore, RoleStore, RouteGuard, SetupOrchestrator, SetupProber,
};

/// Database connection type alias
pub type DbConn = DatabaseConnection;

/// Shared database connection (optional until the database is reachable)
pub type SharedDbConn = Arc<RwLock<Option<DbConn>>>;

/// Broadcast channel for setup progress to WebSocket clients
pub type SetupBroadcast = broadcast::Sender<String>;

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDbConn,
    pub prober: SetupProber,
    pub guard: RouteGuard,
    pub orchestrator: Arc<SetupOrchestrator>,
    pub setup_tx: SetupBroadcast,
    pub setup: SetupConfig,
}

impl AppState {
    /// State whose setup probe reads the local database
    pub fn new(
        db: Option<DbConn>,
        bootstrap_client: Arc<dyn BootstrapClient>,
        setup: SetupConfig,
    ) -> Self {
        let db: SharedDbConn = Arc::new(RwLock::new(db));
        let store: Arc<dyn RoleStore> = Arc::new(DbRoleStore::new(db.clone()));
        Self::with_role_store(db, store, bootstrap_client, setup)
    }

    /// State whose setup probe reads through the given role store
    pub fn with_role_store(
        db: SharedDbConn,
        role_store: Arc<dyn RoleStore>,
        bootstrap_client: Arc<dyn BootstrapClient>,
        setup: SetupConfig,
    ) -> Self {
        // Create broadcast channel for setup progress (capacity of 32 messages)
        let (setup_tx, _) = broadcast::channel(32);

        let prober = SetupProber::new(role_store);
        let guard = RouteGuard::new(prober.clone(), setup.setup_path.clone());
        let orchestrator = Arc::new(SetupOrchestrator::new(
            bootstrap_client,
            setup_tx.clone(),
            &setup,
        ));

        Self {
            db,
            prober,
            guard,
            orchestrator,
            setup_tx,
            setup,
        }
    }

    /// Set the database connection once it becomes reachable
    pub async fn set_db(&self, db: DbConn) {
        let mut db_guard = self.db.write().await;
        *db_guard = Some(db);
    }

    /// Get the database connection (returns error if not connected)
    pub async fn get_db(&self) -> crate::error::Result<DbConn> {
        let db_guard = self.db.read().await;
        db_guard.clone().ok_or_else(|| {
            crate::error::AppError::ServiceUnavailable("Database not connected".to_string())
        })
    }

    /// Check if database is connected
    pub async fn is_db_connected(&self) -> bool {
        let db_guard = self.db.read().await;
        db_guard.is_some()
    }
}
