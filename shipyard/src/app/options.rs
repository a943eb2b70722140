//! Application configuration options

use std::time::Duration;

use crate::deploy::orchestrator::OrchestratorOptions;
use crate::errors::DeployError;
use crate::logs::LogOptions;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Cloud API base URL
    pub api_base_url: String,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Poll loop options
    pub poll: PollOptions,

    /// Orchestrator options
    pub orchestrator: OrchestratorOptions,

    /// Logging options
    pub log: LogOptions,
}

impl AppOptions {
    /// Derive options from a settings file
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api_base_url: settings.api.base_url.clone(),
            request_timeout: Duration::from_secs(settings.api.request_timeout_secs),
            poll: PollOptions {
                interval: Duration::from_secs(settings.poll.interval_secs),
                timeout: Duration::from_secs(settings.poll.timeout_secs),
            },
            orchestrator: OrchestratorOptions {
                max_transport_errors: settings.poll.max_transport_errors,
            },
            log: LogOptions {
                log_level: settings.log_level,
                json_format: settings.log_json,
                log_dir: settings.log_dir.clone(),
            },
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Poll loop timing
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Delay between status reads
    pub interval: Duration,

    /// Overall budget for one deployment
    pub timeout: Duration,
}

impl PollOptions {
    /// Reject timings the poll loop cannot honor
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.interval.is_zero() {
            return Err(DeployError::Configuration(
                "Poll interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}
