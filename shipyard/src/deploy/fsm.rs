//! Finite State Machine for remote deployment phases

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Phase of a remote deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Initial state, the submission has not been acknowledged yet
    Submitting,

    /// Queued by the provider
    Pending,

    /// Build in progress
    Building,

    /// Rollout in progress
    Deploying,

    /// Live and healthy
    Active,

    /// Preempted by a newer deployment
    Superseded,

    /// Build or rollout failed
    Error,

    /// Canceled on the provider side
    Canceled,

    /// Provider reported a phase we do not recognise
    Unknown,
}

impl Phase {
    /// Position on the path towards a terminal phase
    fn rank(self) -> u8 {
        match self {
            Phase::Submitting | Phase::Unknown => 0,
            Phase::Pending => 1,
            Phase::Building => 2,
            Phase::Deploying => 3,
            Phase::Active | Phase::Superseded | Phase::Error | Phase::Canceled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 4
    }

    /// Terminal phases other than `Active`
    pub fn is_failure(self) -> bool {
        matches!(self, Phase::Superseded | Phase::Error | Phase::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Submitting => "SUBMITTING",
            Phase::Pending => "PENDING",
            Phase::Building => "BUILDING",
            Phase::Deploying => "DEPLOYING",
            Phase::Active => "ACTIVE",
            Phase::Superseded => "SUPERSEDED",
            Phase::Error => "ERROR",
            Phase::Canceled => "CANCELED",
            Phase::Unknown => "UNKNOWN",
        }
    }

    /// Map a provider phase string, tolerating the spellings seen in the wild
    pub fn from_provider(raw: &str) -> Phase {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "PENDING_BUILD" | "QUEUED" => Phase::Pending,
            "BUILDING" => Phase::Building,
            "PENDING_DEPLOY" | "DEPLOYING" => Phase::Deploying,
            "ACTIVE" | "SUCCESS" => Phase::Active,
            "SUPERSEDED" => Phase::Superseded,
            "ERROR" => Phase::Error,
            "CANCELED" | "CANCELLED" => Phase::Canceled,
            _ => Phase::Unknown,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("SUBMITTING") {
            return Ok(Phase::Submitting);
        }
        if trimmed.eq_ignore_ascii_case("UNKNOWN") {
            return Ok(Phase::Unknown);
        }

        match Phase::from_provider(trimmed) {
            Phase::Unknown => Err(format!("Invalid phase: {}", s)),
            phase => Ok(phase),
        }
    }
}

/// Tracks the phase of one deployment and enforces forward-only transitions
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    phase: Phase,
    transitions: u32,
}

impl PhaseTracker {
    /// Create a new tracker in the submitting phase
    pub fn new() -> Self {
        Self {
            phase: Phase::Submitting,
            transitions: 0,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of phase changes observed so far
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Fold an observed phase into the tracker.
    ///
    /// Returns `Ok(true)` when the phase moved forward, `Ok(false)` when the
    /// observation carried no new information and `Err` when it would move
    /// the deployment backwards or out of a terminal phase.
    pub fn process(&mut self, observed: Phase) -> Result<bool, String> {
        let current = self.phase;

        if observed == Phase::Unknown || observed == current {
            return Ok(false);
        }

        if current.is_terminal() {
            return Err(format!(
                "Invalid transition: {} is terminal, ignoring {}",
                current, observed
            ));
        }

        if observed.rank() < current.rank() {
            return Err(format!(
                "Invalid transition: {} -> {} moves backwards",
                current, observed
            ));
        }

        self.phase = observed;
        self.transitions += 1;
        Ok(true)
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
