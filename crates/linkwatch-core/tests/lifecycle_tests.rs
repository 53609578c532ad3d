//! End-to-end lifecycle scenarios for a single user context
//!
//! Drives connect, activity, expiry sweep, disconnect, lockout and reset
//! through a mock clock and scripted probe outcomes.

use linkwatch_core::{
    ConnectOutcome, ConnectionAttemptEvaluator, ConnectionStatus, FixedProbe, SessionId,
    UserConnectionState,
};

use test_utils::{
    connect_ok, create_manager, scripted_manager, seeded_probe, MockTimeSource, SESSION_TIMEOUT,
};

#[test]
fn test_lockout_scenario() {
    let clock = MockTimeSource::new_at(1_700_000_000_000);
    let mut manager = create_manager(FixedProbe::failing(), &clock);

    assert_eq!(manager.connection_state(), UserConnectionState::Offline);
    assert_eq!(manager.failed_attempts(), 0);

    for _ in 0..4 {
        assert!(!manager.connect("10.0.0.1", "deviceA").is_connected());
    }
    assert_eq!(manager.connection_state(), UserConnectionState::Offline);
    assert_eq!(manager.failed_attempts(), 4);
    assert!(!manager.is_blocked());

    assert_eq!(
        manager.connect("10.0.0.1", "deviceA"),
        ConnectOutcome::LockedOut { failed_attempts: 5 }
    );
    assert_eq!(manager.connection_state(), UserConnectionState::Blocked);
    assert_eq!(manager.failed_attempts(), 5);
    assert!(manager.is_blocked());

    manager.reset_security_status();
    assert_eq!(manager.connection_state(), UserConnectionState::Offline);
    assert_eq!(manager.failed_attempts(), 0);
    assert!(!manager.is_blocked());
}

#[test]
fn test_connect_disconnect_scenario() {
    let clock = MockTimeSource::new();
    let mut manager = create_manager(FixedProbe::succeeding(), &clock);

    let outcome = manager.connect("10.0.0.1", "deviceA");
    assert!(outcome.is_connected());
    let session_id = outcome.session_id().cloned().unwrap();

    assert_eq!(manager.active_session_count(), 1);
    assert_eq!(manager.connection_state(), UserConnectionState::Online);

    assert!(manager.disconnect_session(&session_id));
    assert_eq!(manager.active_session_count(), 0);
    assert_eq!(manager.connection_state(), UserConnectionState::Offline);

    assert!(!manager.disconnect_session(&session_id));
}

#[test]
fn test_lockout_survives_successful_probe() {
    // Five failures, then a probe that would succeed: the account stays locked
    let clock = MockTimeSource::new();
    let mut manager = scripted_manager(&[false, false, false, false, false, true], &clock);

    for _ in 0..5 {
        let _ = manager.connect("10.0.0.1", "d");
    }
    let logs_before = manager.connection_logs().len();

    assert_eq!(manager.connect("10.0.0.1", "d"), ConnectOutcome::Rejected);
    assert_eq!(manager.session_count(), 0);
    assert_eq!(manager.failed_attempts(), 5);
    assert_eq!(manager.connection_logs().len(), logs_before + 1);

    // After a reset the queued success goes through
    manager.reset_security_status();
    assert!(manager.connect("10.0.0.1", "d").is_connected());
    assert_eq!(manager.connection_state(), UserConnectionState::Online);
}

#[test]
fn test_session_survives_until_swept() {
    let clock = MockTimeSource::new();
    let mut manager = create_manager(FixedProbe::succeeding(), &clock);
    let session_id = connect_ok(&mut manager, "10.0.0.1");

    clock.advance_by(SESSION_TIMEOUT);
    assert_eq!(manager.active_session_count(), 1);

    clock.advance(1);
    // Expired but still stored until a sweep runs
    assert_eq!(manager.active_session_count(), 0);
    assert_eq!(manager.session_count(), 1);
    assert!(manager.session(&session_id).is_some());

    assert_eq!(manager.clean_expired_sessions(), vec![session_id.clone()]);
    assert_eq!(manager.session_count(), 0);
    assert!(manager.clean_expired_sessions().is_empty());

    // Sweeping does not drive the state machine
    assert_eq!(manager.connection_state(), UserConnectionState::Online);
}

#[test]
fn test_activity_keeps_session_alive() {
    let clock = MockTimeSource::new();
    let mut manager = create_manager(FixedProbe::succeeding(), &clock);
    let session_id = connect_ok(&mut manager, "10.0.0.1");

    for _ in 0..6 {
        clock.advance(25 * 60 * 1000);
        assert!(manager.update_session_activity(&session_id));
    }

    assert!(manager.clean_expired_sessions().is_empty());
    assert_eq!(manager.active_session_count(), 1);

    let session = manager.session(&session_id).unwrap();
    assert_eq!(session.last_activity().as_millis(), clock.current_time());
}

#[test]
fn test_expired_session_cannot_be_revived() {
    let clock = MockTimeSource::new();
    let mut manager = create_manager(FixedProbe::succeeding(), &clock);
    let session_id = connect_ok(&mut manager, "10.0.0.1");

    clock.advance_by(SESSION_TIMEOUT);
    clock.advance(1);

    let logs_before = manager.connection_logs().len();
    assert!(!manager.update_session_activity(&session_id));
    assert_eq!(manager.connection_logs().len(), logs_before);
    assert_eq!(manager.active_session_count(), 0);
}

#[test]
fn test_disconnect_with_unswept_expired_sibling() {
    let clock = MockTimeSource::new();
    let mut manager = create_manager(FixedProbe::succeeding(), &clock);
    let stale = connect_ok(&mut manager, "10.0.0.1");

    clock.advance(29 * 60 * 1000);
    let fresh = connect_ok(&mut manager, "10.0.0.2");
    clock.advance(2 * 60 * 1000);

    // `stale` is expired but still stored, so the set is not empty afterwards
    assert!(manager.disconnect_session(&fresh));
    assert_eq!(manager.connection_state(), UserConnectionState::Online);

    assert!(manager.disconnect_session(&stale));
    assert_eq!(manager.connection_state(), UserConnectionState::Offline);
}

#[test]
fn test_failed_connect_does_not_touch_sessions() {
    let clock = MockTimeSource::new();
    let mut manager = scripted_manager(&[true, false], &clock);
    let session_id = connect_ok(&mut manager, "10.0.0.1");

    assert_eq!(
        manager.connect("10.0.0.1", "d"),
        ConnectOutcome::Failed { failed_attempts: 1 }
    );
    assert_eq!(manager.connection_state(), UserConnectionState::Offline);
    assert!(manager.session(&session_id).is_some());
    assert_eq!(manager.active_session_count(), 1);
}

#[test]
fn test_unknown_session_operations_are_noops() {
    let clock = MockTimeSource::new();
    let mut manager = create_manager(FixedProbe::succeeding(), &clock);
    let missing = SessionId::from("SESSION_0_deadbeef");

    assert!(!manager.update_session_activity(&missing));
    assert!(!manager.disconnect_session(&missing));
    assert!(manager.connection_logs().is_empty());
    assert_eq!(manager.connection_state(), UserConnectionState::Offline);
}

#[test]
fn test_activity_log_timestamps_follow_clock() {
    let clock = MockTimeSource::new_at(5_000);
    let mut manager = create_manager(FixedProbe::failing(), &clock);

    let _ = manager.connect("10.0.0.9", "d");
    clock.advance(250);
    manager.reset_security_status();

    let entries = manager.activity_entries();
    let stamps: Vec<u64> = entries.iter().map(|e| e.timestamp.as_millis()).collect();
    assert_eq!(stamps, vec![5_000, 5_000, 5_250]);
    assert!(entries.iter().all(|e| e.username == "tester"));
    assert_eq!(
        manager.connection_logs()[2],
        "[5.250] User: tester - Security status reset"
    );
}

#[test]
fn test_evaluator_with_seeded_probe_is_reproducible() {
    let run = |seed| {
        let clock = MockTimeSource::new();
        let mut evaluator = ConnectionAttemptEvaluator::new(Box::new(seeded_probe(seed)), clock);
        let outcomes: Vec<bool> = (0..50).map(|_| evaluator.attempt("10.0.0.1")).collect();
        (outcomes, evaluator.retry_count(), evaluator.speed_mbps())
    };

    assert_eq!(run(11), run(11));

    let (outcomes, retries, _) = run(11);
    let failures = outcomes.iter().filter(|ok| !**ok).count() as u32;
    assert_eq!(retries, failures);
}

#[test]
fn test_evaluator_history_and_reset() {
    let clock = MockTimeSource::new_at(1_000);
    let mut evaluator = ConnectionAttemptEvaluator::new(Box::new(FixedProbe::failing()), clock.clone());

    for _ in 0..3 {
        evaluator.attempt("10.0.0.1");
        clock.advance(1_000);
    }
    assert!(evaluator.has_reached_max_retries());

    evaluator.reset();
    assert_eq!(evaluator.status(), ConnectionStatus::Reset);
    assert_eq!(evaluator.retry_count(), 0);
    assert_eq!(evaluator.attempts_for("10.0.0.1"), 3);

    assert_eq!(
        evaluator.history(),
        vec![
            "[1.000] Action: CONNECT, Result: Failed - Attempt 1",
            "[2.000] Action: CONNECT, Result: Failed - Attempt 2",
            "[3.000] Action: CONNECT, Result: Failed - Attempt 3",
            "[4.000] Action: RESET, Result: Connection reset successful",
        ]
    );
}
