pub mod database_setup;
pub mod setup;

pub use setup::{
    DbRoleStore, HttpBootstrapClient, RestRoleStore, RouteGuard, SetupOrchestrator, SetupProber,
};
