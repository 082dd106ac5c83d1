//! Client for the `setup-database` bootstrap function.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::catalog::RemoteStep;
use crate::config::backend::setup_function_url;

/// Successful reply from the bootstrap function
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StepReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// A remote step that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFailure {
    /// The function answered with a non-2xx status
    #[error("{message} (status {status})")]
    Rejected { status: u16, message: String },

    /// The request never produced a usable response
    #[error("{message}")]
    Transport { message: String },
}

impl StepFailure {
    /// Text shown to the user
    pub fn message(&self) -> &str {
        match self {
            StepFailure::Rejected { message, .. } | StepFailure::Transport { message } => message,
        }
    }
}

/// Runs one remote setup step
#[async_trait]
pub trait BootstrapClient: Send + Sync {
    async fn run_step(&self, step: RemoteStep) -> Result<StepReply, StepFailure>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Pull the `error` field out of a failure body, falling back to the step's
/// generic message when the body is not JSON or carries no usable message
pub fn extract_error_message(step: RemoteStep, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| step.failure_message().to_string())
}

/// Bootstrap client posting to `{base}/functions/v1/setup-database`
pub struct HttpBootstrapClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpBootstrapClient {
    /// `base_url` may carry trailing slashes; they are stripped before joining
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            url: setup_function_url(base_url),
            api_key,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BootstrapClient for HttpBootstrapClient {
    async fn run_step(&self, step: RemoteStep) -> Result<StepReply, StepFailure> {
        tracing::debug!("Posting setup step '{}' to {}", step, self.url);

        let mut request = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "step": step }));
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }

        let resp = request.send().await.map_err(|e| StepFailure::Transport {
            message: format!("{}: {}", step.failure_message(), e),
        })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| StepFailure::Transport {
            message: format!("{}: {}", step.failure_message(), e),
        })?;

        if !status.is_success() {
            return Err(StepFailure::Rejected {
                status: status.as_u16(),
                message: extract_error_message(step, &body),
            });
        }

        // The success body is informational only
        let reply = serde_json::from_slice::<StepReply>(&body).unwrap_or_else(|e| {
            tracing::debug!("Ignoring unparsable reply for step '{}': {}", step, e);
            StepReply {
                success: true,
                message: None,
            }
        });

        Ok(reply)
    }
}
