//! Error types for shipyard

use thiserror::Error;

/// Main error type for deployment operations
#[derive(Error, Debug)]
pub enum DeployError {
    /// Missing credential or malformed request, never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request could not complete at the network layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API rejected a create or trigger call
    #[error("Submission failed: {status} - {body}")]
    SubmissionFailed { status: u16, body: String },

    /// The app exists but its deployment could not be started. Retrying the
    /// create would make a second app; redeploy `app_id` instead.
    #[error("App {app_id} was created but no deployment was started: {source}")]
    TriggerFailed {
        app_id: String,
        #[source]
        source: Box<DeployError>,
    },

    /// A read call answered with a non-success status
    #[error("Status unavailable: {status} - {body}")]
    StatusUnavailable { status: u16, body: String },

    /// A response arrived but its body was not what the API contract promises
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Whether the error came from the network rather than from the API
    pub fn is_transport(&self) -> bool {
        matches!(self, DeployError::Transport(_))
    }

    /// Whether a poll that hit this error should simply be retried
    pub fn is_transient_read(&self) -> bool {
        matches!(
            self,
            DeployError::StatusUnavailable { .. } | DeployError::Decode(_)
        )
    }
}

impl From<reqwest::Error> for DeployError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DeployError::Decode(err.to_string())
        } else {
            DeployError::Transport(err.to_string())
        }
    }
}
