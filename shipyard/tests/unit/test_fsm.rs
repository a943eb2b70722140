//! FSM unit tests

use shipyard::deploy::fsm::{Phase, PhaseTracker};

#[test]
fn test_tracker_initial_state() {
    let tracker = PhaseTracker::new();
    assert_eq!(tracker.phase(), Phase::Submitting);
    assert!(!tracker.phase().is_terminal());
    assert_eq!(tracker.transitions(), 0);
}

#[test]
fn test_tracker_success_flow() {
    let mut tracker = PhaseTracker::new();

    // Submitting -> Pending
    assert!(tracker.process(Phase::Pending).unwrap());
    assert_eq!(tracker.phase(), Phase::Pending);

    // Pending -> Building
    assert!(tracker.process(Phase::Building).unwrap());

    // Building -> Deploying
    assert!(tracker.process(Phase::Deploying).unwrap());

    // Deploying -> Active
    assert!(tracker.process(Phase::Active).unwrap());
    assert_eq!(tracker.phase(), Phase::Active);
    assert!(tracker.phase().is_terminal());
    assert!(!tracker.phase().is_failure());
    assert_eq!(tracker.transitions(), 4);
}

#[test]
fn test_tracker_failure_flow() {
    let mut tracker = PhaseTracker::new();

    tracker.process(Phase::Pending).unwrap();
    tracker.process(Phase::Building).unwrap();
    tracker.process(Phase::Error).unwrap();

    assert_eq!(tracker.phase(), Phase::Error);
    assert!(tracker.phase().is_failure());
}

#[test]
fn test_tracker_skips_phases() {
    let mut tracker = PhaseTracker::new();

    // A fast deployment may never be observed building
    assert!(tracker.process(Phase::Deploying).unwrap());
    assert!(tracker.process(Phase::Active).unwrap());
    assert_eq!(tracker.transitions(), 2);
}

#[test]
fn test_tracker_repeated_phase_is_no_op() {
    let mut tracker = PhaseTracker::new();

    tracker.process(Phase::Building).unwrap();
    assert!(!tracker.process(Phase::Building).unwrap());
    assert!(!tracker.process(Phase::Building).unwrap());
    assert_eq!(tracker.transitions(), 1);
}

#[test]
fn test_tracker_invalid_transition() {
    let mut tracker = PhaseTracker::new();

    tracker.process(Phase::Deploying).unwrap();

    // Deploying -> Building moves backwards
    let result = tracker.process(Phase::Building);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("backwards"));
    assert_eq!(tracker.phase(), Phase::Deploying);
}

#[test]
fn test_tracker_terminal_phases_are_final() {
    for terminal in [Phase::Active, Phase::Error, Phase::Canceled, Phase::Superseded] {
        let mut tracker = PhaseTracker::new();
        tracker.process(terminal).unwrap();

        for next in [Phase::Pending, Phase::Building, Phase::Active, Phase::Error] {
            if next == terminal {
                continue;
            }
            assert!(tracker.process(next).is_err(), "{} -> {}", terminal, next);
        }
        assert_eq!(tracker.phase(), terminal);
    }
}

#[test]
fn test_tracker_ignores_unknown() {
    let mut tracker = PhaseTracker::new();

    tracker.process(Phase::Building).unwrap();
    assert!(!tracker.process(Phase::Unknown).unwrap());
    assert_eq!(tracker.phase(), Phase::Building);
}

#[test]
fn test_failure_phases_are_distinct() {
    assert!(Phase::Superseded.is_failure());
    assert!(Phase::Canceled.is_failure());
    assert!(Phase::Error.is_failure());
    assert_ne!(Phase::Superseded, Phase::Canceled);
    assert!(!Phase::Active.is_failure());
    assert!(!Phase::Deploying.is_failure());
}

#[test]
fn test_phase_display_round_trip() {
    for phase in [
        Phase::Submitting,
        Phase::Pending,
        Phase::Building,
        Phase::Deploying,
        Phase::Active,
        Phase::Superseded,
        Phase::Error,
        Phase::Canceled,
        Phase::Unknown,
    ] {
        assert_eq!(phase.to_string().parse::<Phase>(), Ok(phase));
    }
}

#[test]
fn test_provider_aliases() {
    assert_eq!(Phase::from_provider("QUEUED"), Phase::Pending);
    assert_eq!(Phase::from_provider(" building "), Phase::Building);
    assert_eq!(Phase::from_provider("PENDING_DEPLOY"), Phase::Deploying);
    assert_eq!(Phase::from_provider(""), Phase::Unknown);
}

#[test]
fn test_phase_serde() {
    assert_eq!(
        serde_json::to_string(&Phase::Superseded).unwrap(),
        "\"SUPERSEDED\""
    );
    let phase: Phase = serde_json::from_str("\"DEPLOYING\"").unwrap();
    assert_eq!(phase, Phase::Deploying);
}
