//! Route guard deciding whether protected content may render.

use super::prober::{SetupProber, SetupStatus};

/// What a guarded route should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<T> {
    /// Probe still in flight; show a neutral loading indicator
    Loading,
    Render(T),
    /// Leave for the setup screen; `replace` keeps the guarded URL out of history
    Redirect { to: String, replace: bool },
}

impl<T> GuardView<T> {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardView::Render(_))
    }
}

/// Gates protected content on setup completion
#[derive(Clone)]
pub struct RouteGuard {
    prober: SetupProber,
    setup_path: String,
}

impl RouteGuard {
    pub fn new(prober: SetupProber, setup_path: impl Into<String>) -> Self {
        Self {
            prober,
            setup_path: setup_path.into(),
        }
    }

    pub fn setup_path(&self) -> &str {
        &self.setup_path
    }

    /// Map a probe result (or its absence) to a view
    ///
    /// Anything other than `Ready` redirects; inconclusive probes never show
    /// protected content.
    pub fn render<T>(&self, status: Option<SetupStatus>, children: T) -> GuardView<T> {
        match status {
            None => GuardView::Loading,
            Some(SetupStatus::Ready) => GuardView::Render(children),
            Some(SetupStatus::NeedsSetup) | Some(SetupStatus::Unknown) => GuardView::Redirect {
                to: self.setup_path.clone(),
                replace: true,
            },
        }
    }

    /// Run the probe once and decide
    pub async fn check(&self) -> SetupStatus {
        let prober = self.prober.clone();
        match tokio::spawn(async move { prober.probe().await }).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Setup probe task failed: {}", e);
                SetupStatus::Unknown
            }
        }
    }

    /// Probe exactly once, then render `children` or redirect
    pub async fn guard<T>(&self, children: T) -> GuardView<T> {
        let status = self.check().await;
        self.render(Some(status), children)
    }
}
