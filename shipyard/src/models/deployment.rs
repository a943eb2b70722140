//! Deployment models

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::deploy::fsm::{Phase, PhaseTracker};

/// Reference to an in-flight or completed remote deployment
#[derive(Debug, Clone)]
pub struct DeploymentHandle {
    resource_id: String,
    action_id: String,
    submitted_at: DateTime<Utc>,
    tracker: PhaseTracker,
}

impl DeploymentHandle {
    /// Create a handle for an action the provider has acknowledged
    pub fn new(resource_id: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            action_id: action_id.into(),
            submitted_at: Utc::now(),
            tracker: PhaseTracker::new(),
        }
    }

    /// App ID
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Deployment ID
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Last observed phase
    pub fn phase(&self) -> Phase {
        self.tracker.phase()
    }

    pub fn is_terminal(&self) -> bool {
        self.tracker.phase().is_terminal()
    }

    /// Fold a new observation into the handle, see [`PhaseTracker::process`]
    pub(crate) fn observe(&mut self, phase: Phase) -> Result<bool, String> {
        self.tracker.process(phase)
    }
}

/// One observation of remote status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollResult {
    /// Phase as reported by the provider on this tick
    pub phase: Phase,

    pub observed_at: DateTime<Utc>,
}

impl PollResult {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            observed_at: Utc::now(),
        }
    }
}

/// What a poll loop saw before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSummary {
    /// Handle phase when the loop returned
    pub last_phase: Phase,

    /// Number of status reads issued
    pub polls: u32,

    /// Wall-clock time spent in the loop
    pub elapsed: Duration,

    /// Most recent failed read, if any
    pub last_error: Option<String>,
}

/// Terminal result of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The deployment reached `ACTIVE`
    Success(PollSummary),

    /// The deployment reached `ERROR`, `CANCELED` or `SUPERSEDED`
    Failure { phase: Phase, summary: PollSummary },

    /// No terminal phase before the timeout; the deployment may still be running
    TimedOut(PollSummary),

    /// The caller gave up
    Canceled(PollSummary),

    /// Too many consecutive network failures
    TransportError { error: String, summary: PollSummary },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn summary(&self) -> &PollSummary {
        match self {
            Outcome::Success(summary)
            | Outcome::TimedOut(summary)
            | Outcome::Canceled(summary)
            | Outcome::Failure { summary, .. }
            | Outcome::TransportError { summary, .. } => summary,
        }
    }

    /// Process exit code for CLI callers
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success(_) => 0,
            Outcome::Failure { .. } => 2,
            Outcome::TimedOut(_) => 3,
            Outcome::TransportError { .. } => 4,
            Outcome::Canceled(_) => 130,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        match self {
            Outcome::Success(_) => write!(
                f,
                "deployment active after {} polls ({:?})",
                summary.polls, summary.elapsed
            ),
            Outcome::Failure { phase, .. } => write!(
                f,
                "deployment ended in {} after {} polls ({:?})",
                phase, summary.polls, summary.elapsed
            ),
            Outcome::TimedOut(_) => write!(
                f,
                "deployment still {} after {:?}, it may yet complete",
                summary.last_phase, summary.elapsed
            ),
            Outcome::Canceled(_) => write!(
                f,
                "stopped waiting while deployment was {}",
                summary.last_phase
            ),
            Outcome::TransportError { error, .. } => write!(
                f,
                "lost contact with the API while deployment was {}: {}",
                summary.last_phase, error
            ),
        }?;

        if let (false, Some(err)) = (self.is_success(), &summary.last_error) {
            if !matches!(self, Outcome::TransportError { .. }) {
                write!(f, " (last error: {})", err)?;
            }
        }
        Ok(())
    }
}
