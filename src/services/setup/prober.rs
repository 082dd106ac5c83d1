//! Setup status probe.
//!
//! Reads the role table to decide whether first-run setup has already happened.
//! Every read failure collapses into [`SetupStatus::NeedsSetup`]; the error kind is
//! only ever logged.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::backend::REST_PATH;
use crate::models::prelude::*;
use crate::models::user_role::{self, ADMIN_ROLE};
use crate::state::SharedDbConn;

/// Outcome of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStatus {
    Ready,
    NeedsSetup,
    /// The probe itself could not complete
    Unknown,
}

impl SetupStatus {
    pub fn is_ready(self) -> bool {
        matches!(self, SetupStatus::Ready)
    }
}

/// Why a role table read failed
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("role table does not exist")]
    TableUnavailable,

    #[error("role table read rejected with status {status}")]
    Rejected { status: u16 },

    #[error("role table read failed: {0}")]
    Transport(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("database not connected")]
    NotConnected,
}

/// Read access to the administrative role table
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Read at most one row of the role table
    async fn table_accessible(&self) -> Result<(), ProbeError>;

    /// Number of rows carrying the admin role, capped at `limit`
    async fn admin_rows(&self, limit: u64) -> Result<usize, ProbeError>;
}

/// Decides whether setup is complete
#[derive(Clone)]
pub struct SetupProber {
    store: Arc<dyn RoleStore>,
}

impl SetupProber {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    /// Probe the role table once; read-only, no retries
    pub async fn probe(&self) -> SetupStatus {
        if let Err(e) = self.store.table_accessible().await {
            log_probe_failure("role table read", &e);
            return SetupStatus::NeedsSetup;
        }

        match self.store.admin_rows(1).await {
            Ok(0) => {
                tracing::debug!("No admin role assigned yet, setup required");
                SetupStatus::NeedsSetup
            }
            Ok(_) => SetupStatus::Ready,
            Err(e) => {
                log_probe_failure("admin role read", &e);
                SetupStatus::NeedsSetup
            }
        }
    }
}

fn log_probe_failure(read: &str, error: &ProbeError) {
    match error {
        ProbeError::TableUnavailable | ProbeError::NotConnected => {
            tracing::debug!("Setup probe: {} failed: {}", read, error)
        }
        _ => tracing::warn!("Setup probe: {} failed: {}", read, error),
    }
}

// ============================================================================
// Database-backed role store
// ============================================================================

/// Role store over this service's own database connection
pub struct DbRoleStore {
    db: SharedDbConn,
}

impl DbRoleStore {
    pub fn new(db: SharedDbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleStore for DbRoleStore {
    async fn table_accessible(&self) -> Result<(), ProbeError> {
        let db_guard = self.db.read().await;
        let db = db_guard.as_ref().ok_or(ProbeError::NotConnected)?;

        UserRole::find()
            .limit(1)
            .all(db)
            .await
            .map_err(|e| ProbeError::Database(e.to_string()))?;
        Ok(())
    }

    async fn admin_rows(&self, limit: u64) -> Result<usize, ProbeError> {
        let db_guard = self.db.read().await;
        let db = db_guard.as_ref().ok_or(ProbeError::NotConnected)?;

        let admins = UserRole::find()
            .filter(user_role::Column::Role.eq(ADMIN_ROLE))
            .limit(limit)
            .all(db)
            .await
            .map_err(|e| ProbeError::Database(e.to_string()))?;
        Ok(admins.len())
    }
}

// ============================================================================
// Hosted REST role store
// ============================================================================

/// Role store reading through a hosted PostgREST-style API
pub struct RestRoleStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestRoleStore {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: crate::config::backend::normalize_base_url(base_url),
            api_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}{}/user_roles", self.base_url, REST_PATH)
    }

    async fn select(&self, query: &[(&str, String)]) -> Result<Vec<serde_json::Value>, ProbeError> {
        let mut request = self.client.get(self.table_url()).query(query);
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProbeError::TableUnavailable);
        }
        if !status.is_success() {
            return Err(ProbeError::Rejected {
                status: status.as_u16(),
            });
        }

        resp.json()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))
    }
}

#[async_trait]
impl RoleStore for RestRoleStore {
    async fn table_accessible(&self) -> Result<(), ProbeError> {
        self.select(&[("select", "user_id".to_string()), ("limit", "1".to_string())])
            .await
            .map(|_| ())
    }

    async fn admin_rows(&self, limit: u64) -> Result<usize, ProbeError> {
        let rows = self
            .select(&[
                ("select", "user_id".to_string()),
                ("role", format!("eq.{}", ADMIN_ROLE)),
                ("limit", limit.to_string()),
            ])
            .await?;
        Ok(rows.len())
    }
}
