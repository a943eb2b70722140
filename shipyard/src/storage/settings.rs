//! Settings file management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::http::client::DEFAULT_BASE_URL;
use crate::logs::LogLevel;

/// CLI settings, every field optional in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rotated log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Poll loop configuration
    #[serde(default)]
    pub poll: PollSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            api: ApiSettings::default(),
            poll: PollSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DeployError::Configuration(format!(
                "Unable to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            DeployError::Configuration(format!(
                "Malformed settings file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL for the cloud API
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Seconds between status reads
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Seconds before giving up on a deployment
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,

    /// Consecutive transport errors tolerated, unlimited when absent
    #[serde(default)]
    pub max_transport_errors: Option<u32>,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_poll_timeout() -> u64 {
    600
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            timeout_secs: default_poll_timeout(),
            max_transport_errors: None,
        }
    }
}
