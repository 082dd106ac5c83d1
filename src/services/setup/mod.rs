//! First-run setup: status probe, step orchestration and route guarding.

pub mod catalog;
pub mod client;
pub mod guard;
pub mod orchestrator;
pub mod prober;

pub use catalog::{RemoteStep, SetupStep, StepId, StepStatus, SETUP_STEPS};
pub use client::{BootstrapClient, HttpBootstrapClient, StepFailure, StepReply};
pub use guard::{GuardView, RouteGuard};
pub use orchestrator::{Navigation, SetupEvent, SetupOrchestrator, SetupRun, SetupSnapshot};
pub use prober::{DbRoleStore, ProbeError, RestRoleStore, RoleStore, SetupProber, SetupStatus};
