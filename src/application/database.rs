use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::migrations::Migrator;

pub type DbConn = DatabaseConnection;

/// Create a new database connection using config
///
/// Migrations are not applied here; they run as the `migrations` setup step.
pub async fn connect() -> Result<DbConn> {
    connect_with_url(&CONFIG.database.database_url).await
}

/// Create a new database connection with a specific URL
pub async fn connect_with_url(database_url: &str) -> Result<DbConn> {
    tracing::info!("Connecting to database...");

    let mut opts = ConnectOptions::new(database_url);
    opts.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opts)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}

/// Apply all pending migrations
pub async fn migrate(db: &DbConn) -> Result<()> {
    tracing::info!("Running database migrations...");
    Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;
    tracing::info!("Database migrations completed");
    Ok(())
}

/// Try to connect to database, returns None if connection fails
pub async fn try_connect() -> Option<DbConn> {
    let timeout = Duration::from_secs(CONFIG.database.connect_timeout_secs);
    let result = tokio::time::timeout(timeout, connect()).await;

    match result {
        Ok(Ok(db)) => Some(db),
        Ok(Err(e)) => {
            tracing::info!("Database not available yet: {}", e);
            None
        }
        Err(_) => {
            tracing::info!("Database connection timed out");
            None
        }
    }
}
