//! Setup orchestrator.
//!
//! Drives the fixed step sequence against the bootstrap function, one step at a
//! time. Progress and per-step status live in a [`SetupRun`] that is reset at the
//! start of every run; a failed run can only be retried from the beginning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::catalog::{StepId, StepStatus, SETUP_STEPS, STEP_COUNT};
use super::client::{BootstrapClient, StepFailure};
use crate::config::setup::SetupConfig;

/// Where the caller should go once a run returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    RedirectTo(String),
}

/// Progress event broadcast to WebSocket clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SetupEvent {
    #[serde(rename = "step_started")]
    StepStarted { step: StepId, progress: u8 },
    #[serde(rename = "step_completed")]
    StepCompleted {
        step: StepId,
        progress: u8,
        message: Option<String>,
    },
    #[serde(rename = "step_failed")]
    StepFailed { step: StepId, error: String },
    #[serde(rename = "setup_complete")]
    SetupComplete { redirect_to: String, delay_ms: u64 },
}

/// In-memory state of one setup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRun {
    statuses: [StepStatus; STEP_COUNT],
    current: StepId,
    progress: u8,
    error: Option<String>,
    running: bool,
}

impl Default for SetupRun {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupRun {
    /// Initial configuration: `check` running, everything else pending
    pub fn new() -> Self {
        let mut statuses = [StepStatus::Pending; STEP_COUNT];
        statuses[StepId::Check.index()] = StepStatus::Running;
        Self {
            statuses,
            current: StepId::Check,
            progress: 0,
            error: None,
            running: false,
        }
    }

    pub fn status(&self, step: StepId) -> StepStatus {
        self.statuses[step.index()]
    }

    pub fn statuses(&self) -> &[StepStatus; STEP_COUNT] {
        &self.statuses
    }

    pub fn current_step(&self) -> StepId {
        self.current
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn begin(&mut self) {
        *self = Self::new();
        self.running = true;
    }

    fn start(&mut self, step: StepId, progress: u8) {
        self.current = step;
        self.statuses[step.index()] = StepStatus::Running;
        self.advance(progress);
    }

    fn succeed(&mut self, step: StepId, progress: Option<u8>) {
        self.statuses[step.index()] = StepStatus::Success;
        if let Some(p) = progress {
            self.advance(p);
        }
    }

    /// Mark the current step failed; later steps keep their pending status
    fn fail(&mut self, message: String) {
        self.statuses[self.current.index()] = StepStatus::Error;
        self.error = Some(message);
        self.running = false;
    }

    fn advance(&mut self, progress: u8) {
        debug_assert!(progress >= self.progress, "progress must not decrease");
        self.progress = self.progress.max(progress.min(100));
    }

    /// Serializable view including the step catalog
    pub fn snapshot(&self) -> SetupSnapshot {
        SetupSnapshot {
            steps: SETUP_STEPS
                .iter()
                .map(|s| StepView {
                    id: s.id,
                    name: s.name,
                    description: s.description,
                    status: self.status(s.id),
                })
                .collect(),
            current_step: self.current,
            progress: self.progress,
            error: self.error.clone(),
            running: self.running,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub id: StepId,
    pub name: &'static str,
    pub description: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupSnapshot {
    pub steps: Vec<StepView>,
    pub current_step: StepId,
    pub progress: u8,
    pub error: Option<String>,
    pub running: bool,
}

/// One entry of the run sequence: progress when the step starts and, for steps
/// that wait on the function, progress once it succeeds
struct Stage {
    step: StepId,
    started: u8,
    completed: Option<u8>,
}

const SEQUENCE: [Stage; STEP_COUNT] = [
    Stage { step: StepId::Check, started: 10, completed: None },
    Stage { step: StepId::Migrations, started: 25, completed: Some(40) },
    Stage { step: StepId::Admin, started: 50, completed: Some(65) },
    Stage { step: StepId::Data, started: 75, completed: Some(85) },
    // Function deployment is manual for now; the step always succeeds
    Stage { step: StepId::Functions, started: 95, completed: None },
    Stage { step: StepId::Complete, started: 100, completed: None },
];

/// Held for the duration of a run; releases the running flag on every exit path
struct RunningFlag<'a> {
    flag: &'a AtomicBool,
    run: &'a Mutex<SetupRun>,
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.run.lock().running = false;
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs the setup sequence against a bootstrap client
pub struct SetupOrchestrator {
    client: Arc<dyn BootstrapClient>,
    run: Mutex<SetupRun>,
    running: AtomicBool,
    broadcast_tx: broadcast::Sender<String>,
    redirect_delay: Duration,
    dashboard_path: String,
}

impl SetupOrchestrator {
    pub fn new(
        client: Arc<dyn BootstrapClient>,
        broadcast_tx: broadcast::Sender<String>,
        config: &SetupConfig,
    ) -> Self {
        Self {
            client,
            run: Mutex::new(SetupRun::new()),
            running: AtomicBool::new(false),
            broadcast_tx,
            redirect_delay: config.redirect_delay,
            dashboard_path: config.dashboard_path.clone(),
        }
    }

    /// Copy of the current run state
    pub fn run_state(&self) -> SetupRun {
        self.run.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }

    fn try_acquire(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Run the whole sequence from `check`
    ///
    /// Calls made while a run is active are ignored and return [`Navigation::Stay`].
    /// Failures are recorded in the run state and never returned.
    pub async fn run_setup(&self) -> Navigation {
        if !self.try_acquire() {
            tracing::info!("Setup already running, ignoring request");
            return Navigation::Stay;
        }
        self.run_acquired().await
    }

    /// Claim the running flag now and drive the run on a background task
    ///
    /// Returns `None` when a run is already active.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<Navigation>> {
        if !self.try_acquire() {
            return None;
        }
        let orchestrator = Arc::clone(self);
        Some(tokio::spawn(async move { orchestrator.run_acquired().await }))
    }

    /// Caller must hold the running flag
    async fn run_acquired(&self) -> Navigation {
        let flag = RunningFlag {
            flag: &self.running,
            run: &self.run,
        };

        tracing::info!("Starting database setup");
        self.run.lock().begin();

        match self.drive().await {
            Ok(()) => {
                self.broadcast(SetupEvent::SetupComplete {
                    redirect_to: self.dashboard_path.clone(),
                    delay_ms: self.redirect_delay.as_millis() as u64,
                });
                tracing::info!("Database setup completed");

                tokio::time::sleep(self.redirect_delay).await;
                drop(flag);
                Navigation::RedirectTo(self.dashboard_path.clone())
            }
            Err(failure) => {
                let step = {
                    let mut run = self.run.lock();
                    run.fail(failure.message().to_string());
                    run.current_step()
                };
                drop(flag);

                tracing::error!("Setup step '{}' failed: {}", step, failure);
                self.broadcast(SetupEvent::StepFailed {
                    step,
                    error: failure.message().to_string(),
                });
                Navigation::Stay
            }
        }
    }

    async fn drive(&self) -> Result<(), StepFailure> {
        for stage in &SEQUENCE {
            self.run.lock().start(stage.step, stage.started);
            tracing::debug!("Setup step '{}': {}", stage.step, stage.step.info().name);
            self.broadcast(SetupEvent::StepStarted {
                step: stage.step,
                progress: stage.started,
            });

            let message = match stage.step.remote() {
                Some(remote) => self.client.run_step(remote).await?.message,
                None => None,
            };

            let progress = {
                let mut run = self.run.lock();
                run.succeed(stage.step, stage.completed);
                run.progress()
            };
            if let Some(msg) = &message {
                tracing::info!("Setup step '{}': {}", stage.step, msg);
            }
            self.broadcast(SetupEvent::StepCompleted {
                step: stage.step,
                progress,
                message,
            });
        }
        Ok(())
    }

    /// Broadcast an event to all connected WebSocket clients
    fn broadcast(&self, event: SetupEvent) {
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = self.broadcast_tx.send(json);
        }
    }
}
