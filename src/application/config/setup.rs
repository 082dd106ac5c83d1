use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SetupConfig {
    /// Email whose profile is promoted to admin by the `admin` step
    pub admin_email: String,
    /// Pause between the final step and the redirect into the dashboard
    pub redirect_delay: Duration,
    /// Entry screen of the setup flow
    pub setup_path: String,
    /// Protected application entry
    pub dashboard_path: String,
}

impl SetupConfig {
    pub fn from_env() -> Self {
        Self {
            admin_email: env::var("SETUP_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@videopop.com".to_string()),
            redirect_delay: Duration::from_millis(
                env::var("VIDEOPOPUP_SETUP_REDIRECT_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2000),
            ),
            setup_path: "/setup".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@videopop.com".to_string(),
            redirect_delay: Duration::from_millis(2000),
            setup_path: "/setup".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}
