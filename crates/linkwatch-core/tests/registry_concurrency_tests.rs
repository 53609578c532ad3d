//! Concurrent access to the session registry
//!
//! Many tasks drive distinct users in parallel, and many tasks hammer one
//! shared user; per-user serialization must keep every counter consistent.

use std::sync::Arc;

use futures::future::join_all;
use linkwatch_core::{
    AttemptProbe, FixedProbe, LinkwatchConfig, ProbeFactory, ScriptedProbe, SessionRegistry,
    UserConnectionState, UserId,
};

use test_utils::{MockTimeSource, SESSION_TIMEOUT};

fn succeeding_registry(clock: &MockTimeSource) -> Arc<SessionRegistry<MockTimeSource>> {
    let factory: ProbeFactory =
        Arc::new(|_: &UserId| Box::new(FixedProbe::succeeding()) as Box<dyn AttemptProbe>);
    Arc::new(
        SessionRegistry::with_probe_factory(LinkwatchConfig::default(), clock.clone(), factory)
            .unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_users_in_parallel() {
    let clock = MockTimeSource::new();
    let registry = succeeding_registry(&clock);

    let tasks = (0..16).map(|n| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let user = UserId::new(format!("user-{}", n));
            registry.register(user.clone(), format!("User {}", n)).unwrap();

            let mut sessions = Vec::new();
            for _ in 0..10 {
                let outcome = registry.connect(&user, "10.0.0.1", "d").unwrap();
                sessions.push(outcome.session_id().cloned().unwrap());
            }
            // Disconnect half of them
            for session_id in sessions.iter().take(5) {
                assert!(registry.disconnect_session(&user, session_id).unwrap());
            }
            user
        })
    });

    let users: Vec<UserId> = join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .collect();

    assert_eq!(registry.user_count(), 16);
    for user in &users {
        assert_eq!(registry.active_session_count(user).unwrap(), 5);
        assert_eq!(
            registry.connection_state(user).unwrap(),
            UserConnectionState::Online
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_user_counts_every_failure_once() {
    let clock = MockTimeSource::new();
    let factory: ProbeFactory =
        Arc::new(|_: &UserId| Box::new(FixedProbe::failing()) as Box<dyn AttemptProbe>);
    let registry = Arc::new(
        SessionRegistry::with_probe_factory(LinkwatchConfig::default(), clock.clone(), factory)
            .unwrap(),
    );
    let user = UserId::new("shared");
    registry.register(user.clone(), "Shared").unwrap();

    let tasks = (0..32).map(|_| {
        let registry = Arc::clone(&registry);
        let user = user.clone();
        tokio::spawn(async move { registry.connect(&user, "10.0.0.1", "d").unwrap() })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .collect();

    let locked_out = outcomes
        .iter()
        .filter(|o| matches!(o, linkwatch_core::ConnectOutcome::LockedOut { .. }))
        .count();
    let rejected = outcomes
        .iter()
        .filter(|o| matches!(o, linkwatch_core::ConnectOutcome::Rejected))
        .count();

    // Exactly one connect crosses the threshold; the rest after it are refused
    assert_eq!(locked_out, 1);
    assert_eq!(rejected, 32 - 5);

    registry
        .with_user(&user, |manager| {
            assert_eq!(manager.failed_attempts(), 5);
            assert!(manager.is_blocked());
            assert_eq!(manager.evaluator().attempts_for("10.0.0.1"), 5);
        })
        .unwrap();
}

#[tokio::test]
async fn test_sweep_all_expires_across_users() {
    let clock = MockTimeSource::new();
    let registry = succeeding_registry(&clock);

    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    registry.register(alice.clone(), "Alice").unwrap();
    registry.register(bob.clone(), "Bob").unwrap();

    let _ = registry.connect(&alice, "10.0.0.1", "a").unwrap();
    let _ = registry.connect(&alice, "10.0.0.2", "b").unwrap();
    clock.advance(20 * 60 * 1000);
    let bob_session = registry
        .connect(&bob, "10.0.0.3", "c")
        .unwrap()
        .session_id()
        .cloned()
        .unwrap();

    clock.advance_by(SESSION_TIMEOUT - std::time::Duration::from_secs(20 * 60));
    clock.advance(1);

    assert_eq!(registry.sweep_all(), 2);
    assert_eq!(registry.active_session_count(&alice).unwrap(), 0);
    assert_eq!(registry.active_session_count(&bob).unwrap(), 1);
    assert!(registry.update_session_activity(&bob, &bob_session).unwrap());
}

#[test]
fn test_registered_probe_is_used() {
    let clock = MockTimeSource::new();
    let registry = succeeding_registry(&clock);
    let erin = UserId::new("erin");

    registry
        .register_with_probe(
            erin.clone(),
            "Erin",
            Box::new(ScriptedProbe::from_results([false, true])),
        )
        .unwrap();

    assert!(!registry.connect(&erin, "10.0.0.1", "d").unwrap().is_connected());
    assert!(registry.connect(&erin, "10.0.0.1", "d").unwrap().is_connected());

    let logs = registry.connection_logs(&erin).unwrap();
    assert_eq!(logs.len(), 4);

    registry.reset_security_status(&erin).unwrap();
    assert_eq!(
        registry.connection_state(&erin).unwrap(),
        UserConnectionState::Offline
    );
    assert!(registry
        .connection_info(&erin)
        .unwrap()
        .contains("Failed Login Attempts: 0\n"));
}
