//! Setup status probe tests
//!
//! Covers:
//! - Local database role store: missing table, empty table, non-admin roles, admin present
//! - Read failures of any kind collapse into NeedsSetup
//! - Hosted REST role store: query shape, headers, 404 and error statuses

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{extract::Query, http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use parking_lot::Mutex;
use tokio::sync::RwLock;

mod common;
use common::{
    assign_role, create_admin, create_migrated_db, create_profile, create_test_db, spawn_server,
    unused_addr, FakeRoleStore,
};

use videopopup::services::setup::{DbRoleStore, RestRoleStore, SetupProber, SetupStatus};

fn db_prober(db: Option<sea_orm::DatabaseConnection>) -> SetupProber {
    SetupProber::new(Arc::new(DbRoleStore::new(Arc::new(RwLock::new(db)))))
}

// ============================================================================
// Local database
// ============================================================================

#[tokio::test]
async fn test_probe_needs_setup_when_role_table_missing() {
    let db = create_test_db().await;
    assert_eq!(db_prober(Some(db)).probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_needs_setup_when_not_connected() {
    assert_eq!(db_prober(None).probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_needs_setup_with_empty_role_table() {
    let db = create_migrated_db().await;
    assert_eq!(db_prober(Some(db)).probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_ignores_non_admin_roles() {
    let db = create_migrated_db().await;
    let id = create_profile(&db, "agency@example.com").await;
    assign_role(&db, &id, "agency").await;

    assert_eq!(db_prober(Some(db)).probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_ready_once_admin_exists() {
    let db = create_migrated_db().await;
    create_admin(&db, "admin@videopop.com").await;

    assert_eq!(db_prober(Some(db)).probe().await, SetupStatus::Ready);
}

#[tokio::test]
async fn test_probe_ready_with_several_admins() {
    let db = create_migrated_db().await;
    create_admin(&db, "first@example.com").await;
    create_admin(&db, "second@example.com").await;

    assert_eq!(db_prober(Some(db)).probe().await, SetupStatus::Ready);
}

// ============================================================================
// Failure collapsing
// ============================================================================

#[tokio::test]
async fn test_probe_collapses_missing_table() {
    let store = Arc::new(FakeRoleStore::missing_table());
    let prober = SetupProber::new(store.clone());

    assert_eq!(prober.probe().await, SetupStatus::NeedsSetup);
    // The admin read never runs once the table read failed
    assert_eq!(store.admin_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_probe_collapses_network_error() {
    let prober = SetupProber::new(Arc::new(FakeRoleStore::network_error()));
    assert_eq!(prober.probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_collapses_permission_error() {
    let prober = SetupProber::new(Arc::new(FakeRoleStore::permission_denied()));
    assert_eq!(prober.probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_collapses_admin_read_error() {
    let prober = SetupProber::new(Arc::new(FakeRoleStore::admin_read_fails()));
    assert_eq!(prober.probe().await, SetupStatus::NeedsSetup);
}

#[tokio::test]
async fn test_probe_reads_once_per_call() {
    let store = Arc::new(FakeRoleStore::with_admins(1));
    let prober = SetupProber::new(store.clone());

    assert_eq!(prober.probe().await, SetupStatus::Ready);
    assert_eq!(store.table_reads.load(Ordering::SeqCst), 1);
    assert_eq!(store.admin_reads.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Hosted REST store
// ============================================================================

#[derive(Default)]
struct RecordedRequests {
    queries: Vec<std::collections::HashMap<String, String>>,
    api_keys: Vec<Option<String>>,
}

/// Fake PostgREST table endpoint returning `admin_rows` for admin-filtered reads
async fn spawn_rest_backend(
    status: StatusCode,
    admin_rows: usize,
) -> (String, Arc<Mutex<RecordedRequests>>) {
    let recorded = Arc::new(Mutex::new(RecordedRequests::default()));
    let rec = recorded.clone();

    let app = Router::new().route(
        "/rest/v1/user_roles",
        get(
            move |Query(query): Query<std::collections::HashMap<String, String>>,
                  headers: HeaderMap| {
                let rec = rec.clone();
                async move {
                    let filtered = query.contains_key("role");
                    {
                        let mut rec = rec.lock();
                        rec.api_keys.push(
                            headers
                                .get("apikey")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                        );
                        rec.queries.push(query);
                    }

                    let rows: Vec<serde_json::Value> = if filtered {
                        (0..admin_rows)
                            .map(|i| serde_json::json!({ "user_id": format!("user-{}", i) }))
                            .collect()
                    } else {
                        vec![serde_json::json!({ "user_id": "user-0" })]
                    };
                    (status, Json(rows))
                }
            },
        ),
    );

    let addr = spawn_server(app).await;
    (format!("http://{}/", addr), recorded)
}

#[tokio::test]
async fn test_rest_probe_ready_with_admin_row() {
    let (base, recorded) = spawn_rest_backend(StatusCode::OK, 1).await;
    let store = RestRoleStore::new(reqwest::Client::new(), &base, Some("anon-key".to_string()));

    assert_eq!(
        SetupProber::new(Arc::new(store)).probe().await,
        SetupStatus::Ready
    );

    let rec = recorded.lock();
    assert_eq!(rec.queries.len(), 2, "one table read and one admin read");
    assert_eq!(rec.queries[0].get("limit").map(String::as_str), Some("1"));
    assert_eq!(
        rec.queries[1].get("role").map(String::as_str),
        Some("eq.admin")
    );
    assert_eq!(rec.queries[1].get("limit").map(String::as_str), Some("1"));
    assert!(rec
        .api_keys
        .iter()
        .all(|k| k.as_deref() == Some("anon-key")));
}

#[tokio::test]
async fn test_rest_probe_needs_setup_without_admin_rows() {
    let (base, _) = spawn_rest_backend(StatusCode::OK, 0).await;
    let store = RestRoleStore::new(reqwest::Client::new(), &base, None);

    assert_eq!(
        SetupProber::new(Arc::new(store)).probe().await,
        SetupStatus::NeedsSetup
    );
}

#[tokio::test]
async fn test_rest_probe_needs_setup_when_table_missing() {
    let (base, recorded) = spawn_rest_backend(StatusCode::NOT_FOUND, 1).await;
    let store = RestRoleStore::new(reqwest::Client::new(), &base, None);

    assert_eq!(
        SetupProber::new(Arc::new(store)).probe().await,
        SetupStatus::NeedsSetup
    );
    assert_eq!(recorded.lock().queries.len(), 1);
}

#[tokio::test]
async fn test_rest_probe_needs_setup_when_rejected() {
    let (base, _) = spawn_rest_backend(StatusCode::UNAUTHORIZED, 1).await;
    let store = RestRoleStore::new(reqwest::Client::new(), &base, None);

    assert_eq!(
        SetupProber::new(Arc::new(store)).probe().await,
        SetupStatus::NeedsSetup
    );
}

#[tokio::test]
async fn test_rest_probe_needs_setup_when_unreachable() {
    let addr = unused_addr().await;
    let store = RestRoleStore::new(reqwest::Client::new(), &format!("http://{}", addr), None);

    assert_eq!(
        SetupProber::new(Arc::new(store)).probe().await,
        SetupStatus::NeedsSetup
    );
}
