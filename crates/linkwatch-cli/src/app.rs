//! Scenario playback against the linkwatch core

use std::sync::Arc;
use std::time::Duration;

use linkwatch_core::{
    ConnectOutcome, FixedProbe, LinkwatchConfig, SessionRegistry, SystemTimeSource,
    UserConnectionState, UserId, UserSessionManager,
};
use tracing::{debug, info, warn};

use crate::clock::SteppedClock;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Reports
// ----------------------------------------------------------------------------

/// Final state of one simulated user
#[derive(Debug, Clone, PartialEq)]
pub struct UserReport {
    pub user_id: UserId,
    pub connected: usize,
    pub state: UserConnectionState,
    pub active_sessions: usize,
    pub failed_attempts: u32,
    pub blocked: bool,
}

/// Result of the session expiry walkthrough
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub opened: usize,
    pub expired: usize,
    pub disconnected: usize,
    pub final_state: UserConnectionState,
}

/// Idle period for the session walkthrough, saturating on huge inputs
pub fn idle_window(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

// ----------------------------------------------------------------------------
// Scenario Runner
// ----------------------------------------------------------------------------

pub struct ScenarioRunner {
    config: LinkwatchConfig,
}

impl ScenarioRunner {
    pub fn new(config: LinkwatchConfig) -> Self {
        Self { config }
    }

    /// Drive `users` users concurrently, each issuing `attempts` connects
    pub async fn simulate(
        &self,
        users: usize,
        attempts: usize,
        target: &str,
    ) -> Result<Vec<UserReport>> {
        let registry = Arc::new(SessionRegistry::new(
            self.config.clone(),
            SystemTimeSource,
        )?);
        info!("Simulating {} users with {} connects each", users, attempts);

        let mut handles = Vec::with_capacity(users);
        for n in 0..users {
            let registry = Arc::clone(&registry);
            let target = target.to_string();
            // Dialing may sleep for the configured delay, so keep it off the async workers
            handles.push(tokio::task::spawn_blocking(move || {
                let user_id = UserId::new(format!("user-{}", n + 1));
                registry.register(user_id.clone(), format!("User {}", n + 1))?;

                let mut connected = 0;
                for _ in 0..attempts {
                    match registry.connect(&user_id, &target, "simulated-device")? {
                        ConnectOutcome::Connected(session_id) => {
                            debug!("{} opened {}", user_id, session_id);
                            connected += 1;
                        }
                        ConnectOutcome::LockedOut { failed_attempts } => {
                            warn!("{} locked out after {} failures", user_id, failed_attempts);
                        }
                        ConnectOutcome::Failed { .. } | ConnectOutcome::Rejected => {}
                    }
                }

                registry.with_user(&user_id, |manager| UserReport {
                    user_id: manager.user_id().clone(),
                    connected,
                    state: manager.connection_state(),
                    active_sessions: manager.active_session_count(),
                    failed_attempts: manager.failed_attempts(),
                    blocked: manager.is_blocked(),
                })
                .map_err(CliError::from)
            }));
        }

        let mut reports = Vec::with_capacity(users);
        for handle in handles {
            let report = handle
                .await
                .map_err(|e| CliError::Task(e.to_string()))??;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Fail connects until the account locks, show the refusal, then reset
    pub fn lockout(&self, name: &str) -> UserSessionManager<SystemTimeSource> {
        let mut manager = UserSessionManager::with_config(
            &self.config,
            UserId::new(name),
            name,
            Box::new(FixedProbe::failing()),
            SystemTimeSource,
        );

        loop {
            let outcome = manager.connect("192.0.2.10", "unknown-device");
            if let ConnectOutcome::LockedOut { failed_attempts } = outcome {
                info!("{} locked after {} failed attempts", name, failed_attempts);
                break;
            }
        }

        let refused = manager.connect("192.0.2.10", "unknown-device");
        debug!("Connect while blocked: {:?}", refused);

        manager.reset_security_status();
        manager
    }

    /// Open sessions, keep one alive, idle past the timeout and sweep
    pub fn sessions(&self, count: usize, idle: Duration) -> (SessionReport, Vec<String>) {
        let clock = SteppedClock::starting_now();
        let mut manager = UserSessionManager::with_config(
            &self.config,
            UserId::new("walkthrough"),
            "walkthrough",
            Box::new(FixedProbe::succeeding()),
            clock.clone(),
        );

        let mut opened = Vec::with_capacity(count);
        for n in 0..count {
            let ip = format!("198.51.100.{}", n + 1);
            if let Some(session_id) = manager.connect(&ip, "laptop").session_id() {
                opened.push(session_id.clone());
            }
        }

        // The first session stays busy through the idle period
        let half = idle / 2;
        clock.step(half);
        if let Some(first) = opened.first() {
            manager.update_session_activity(first);
        }
        clock.step(idle - half);

        let expired = manager.clean_expired_sessions();
        let mut disconnected = 0;
        for session_id in opened.iter().filter(|id| !expired.contains(id)) {
            if manager.disconnect_session(session_id) {
                disconnected += 1;
            }
        }

        let report = SessionReport {
            opened: opened.len(),
            expired: expired.len(),
            disconnected,
            final_state: manager.connection_state(),
        };
        (report, manager.connection_logs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_ends_reset() {
        let runner = ScenarioRunner::new(LinkwatchConfig::default());
        let manager = runner.lockout("mallory");

        assert_eq!(manager.connection_state(), UserConnectionState::Offline);
        assert_eq!(manager.failed_attempts(), 0);
        assert!(!manager.is_blocked());

        let logs = manager.connection_logs();
        assert!(logs
            .iter()
            .any(|line| line.ends_with("Account blocked due to multiple failed attempts")));
        assert!(logs
            .iter()
            .any(|line| line.ends_with("Connection blocked due to security policy")));
        assert!(logs
            .last()
            .is_some_and(|line| line.ends_with("Security status reset")));
    }

    #[test]
    fn test_sessions_past_timeout() {
        let runner = ScenarioRunner::new(LinkwatchConfig::default());
        let (report, logs) = runner.sessions(3, Duration::from_secs(45 * 60));

        assert_eq!(
            report,
            SessionReport {
                opened: 3,
                expired: 2,
                disconnected: 1,
                final_state: UserConnectionState::Offline,
            }
        );
        assert_eq!(
            logs.iter().filter(|l| l.contains("Session expired")).count(),
            2
        );
    }

    #[test]
    fn test_sessions_within_timeout() {
        let runner = ScenarioRunner::new(LinkwatchConfig::default());
        let (report, _) = runner.sessions(2, Duration::from_secs(10 * 60));

        assert_eq!(report.expired, 0);
        assert_eq!(report.disconnected, 2);
        assert_eq!(report.final_state, UserConnectionState::Offline);
    }

    #[test]
    fn test_idle_window_saturates() {
        assert_eq!(idle_window(45), Duration::from_secs(45 * 60));
        assert_eq!(idle_window(u64::MAX), Duration::from_secs(u64::MAX));

        let runner = ScenarioRunner::new(LinkwatchConfig::default());
        let (report, _) = runner.sessions(2, idle_window(u64::MAX));
        assert_eq!(report.expired, 2);
        assert_eq!(report.final_state, UserConnectionState::Online);
    }

    #[tokio::test]
    async fn test_simulate_reports_every_user() {
        let runner = ScenarioRunner::new(LinkwatchConfig::testing());
        let reports = runner.simulate(3, 8, "10.0.0.1").await.unwrap();

        assert_eq!(reports.len(), 3);
        for report in &reports {
            assert_eq!(report.active_sessions, report.connected);
            assert!(report.failed_attempts <= 5);
            assert_eq!(report.blocked, report.state == UserConnectionState::Blocked);
        }
    }
}
