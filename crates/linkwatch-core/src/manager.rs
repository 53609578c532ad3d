//! Per-user connection management
//!
//! The `UserSessionManager` is the connection context of one user. It owns
//! the user-visible connection state machine, the connection evaluator that
//! performs attempts, the set of live sessions and the activity log, and it
//! applies the failed-attempt lockout policy.
//!
//! State transitions:
//!
//! ```text
//! Offline --connect--> Connecting --ok--> Online
//!                                 \-fail-> Offline | Blocked (threshold reached)
//! Online | Blocked --last session disconnected--> Offline
//! Blocked --reset_security_status--> Offline
//! ```
//!
//! Leaving `Blocked` through a disconnect does not lift the lockout: the
//! `blocked` flag keeps rejecting connects until the security status is
//! reset.
//!
//! `Idle` and `Disconnecting` are declared but not entered by any transition.
//!
//! The manager is not internally synchronized. Mutating methods take
//! `&mut self`; sharing a context between threads goes through
//! [`crate::registry::SessionRegistry`], which serializes access per user.

use core::fmt;
use core::time::Duration;

use hashbrown::HashMap;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::{ActivityEntry, AuditLog};
use crate::config::LinkwatchConfig;
use crate::evaluator::ConnectionAttemptEvaluator;
use crate::probe::AttemptProbe;
use crate::session::UserSession;
use crate::types::{SessionId, TimeSource, UserId};

// ----------------------------------------------------------------------------
// Connection State
// ----------------------------------------------------------------------------

/// User-visible connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserConnectionState {
    Offline,
    Connecting,
    Online,
    /// Reserved for an idle-timeout transition
    Idle,
    /// Reserved for a graceful-shutdown transition
    Disconnecting,
    /// Locked out after too many failed attempts
    Blocked,
}

impl UserConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserConnectionState::Offline => "OFFLINE",
            UserConnectionState::Connecting => "CONNECTING",
            UserConnectionState::Online => "ONLINE",
            UserConnectionState::Idle => "IDLE",
            UserConnectionState::Disconnecting => "DISCONNECTING",
            UserConnectionState::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for UserConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Connect Outcome
// ----------------------------------------------------------------------------

/// Result of a connect request
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Attempt succeeded and a session was opened
    Connected(SessionId),
    /// Attempt failed; the user is not (yet) locked out
    Failed { failed_attempts: u32 },
    /// Attempt failed and pushed the user over the lockout threshold
    LockedOut { failed_attempts: u32 },
    /// User was already blocked; no attempt was made
    Rejected,
}

impl ConnectOutcome {
    /// Whether the connect succeeded
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected(_))
    }

    /// Identifier of the session opened by a successful connect
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            ConnectOutcome::Connected(id) => Some(id),
            _ => None,
        }
    }
}

impl From<ConnectOutcome> for bool {
    fn from(outcome: ConnectOutcome) -> bool {
        outcome.is_connected()
    }
}

// ----------------------------------------------------------------------------
// User Session Manager
// ----------------------------------------------------------------------------

/// Connection context of a single user
pub struct UserSessionManager<T: TimeSource + Clone> {
    user_id: UserId,
    username: String,
    state: UserConnectionState,
    failed_attempts: u32,
    blocked: bool,
    sessions: HashMap<SessionId, UserSession>,
    activity_log: AuditLog<ActivityEntry>,
    evaluator: ConnectionAttemptEvaluator<T>,
    session_timeout: Duration,
    max_failed_attempts: u32,
    time_source: T,
}

impl<T: TimeSource + Clone> UserSessionManager<T> {
    /// Create a context with the default configuration
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        probe: Box<dyn AttemptProbe>,
        time_source: T,
    ) -> Self {
        Self::with_config(
            &LinkwatchConfig::default(),
            user_id,
            username,
            probe,
            time_source,
        )
    }

    /// Create a context with a custom configuration
    pub fn with_config(
        config: &LinkwatchConfig,
        user_id: UserId,
        username: impl Into<String>,
        probe: Box<dyn AttemptProbe>,
        time_source: T,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            state: UserConnectionState::Offline,
            failed_attempts: 0,
            blocked: false,
            sessions: HashMap::new(),
            activity_log: AuditLog::with_capacity(config.audit.max_entries),
            evaluator: ConnectionAttemptEvaluator::with_config(
                config,
                probe,
                time_source.clone(),
            ),
            session_timeout: config.session.session_timeout,
            max_failed_attempts: config.lockout.max_failed_attempts,
            time_source,
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Attempt to connect the user from `ip_address`
    ///
    /// A blocked user is rejected without contacting the evaluator. On
    /// success a fresh session is opened; on failure the failed-attempt
    /// counter advances and the lockout threshold is checked.
    pub fn connect(&mut self, ip_address: &str, device_info: &str) -> ConnectOutcome {
        if self.blocked {
            self.log_activity("Connection blocked due to security policy".to_string());
            warn!("Rejected connect for blocked user {}", self.user_id);
            return ConnectOutcome::Rejected;
        }

        self.state = UserConnectionState::Connecting;
        self.log_activity(format!("Attempting connection from IP: {}", ip_address));

        if self.evaluator.attempt(ip_address) {
            let now = self.time_source.now();
            let session_id = self.fresh_session_id();
            self.sessions.insert(
                session_id.clone(),
                UserSession::new(session_id.clone(), ip_address, device_info, now),
            );
            self.state = UserConnectionState::Online;
            self.log_activity(format!("Connection established successfully: {}", session_id));
            info!(
                "User {} connected from {} (session {}, {} live)",
                self.user_id,
                ip_address,
                session_id,
                self.sessions.len()
            );
            return ConnectOutcome::Connected(session_id);
        }

        self.handle_failed_connection()
    }

    fn handle_failed_connection(&mut self) -> ConnectOutcome {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.state = UserConnectionState::Offline;

        if self.failed_attempts >= self.max_failed_attempts {
            self.blocked = true;
            self.state = UserConnectionState::Blocked;
            self.log_activity("Account blocked due to multiple failed attempts".to_string());
            warn!(
                "User {} blocked after {} failed attempts",
                self.user_id, self.failed_attempts
            );
            return ConnectOutcome::LockedOut {
                failed_attempts: self.failed_attempts,
            };
        }

        self.log_activity(format!(
            "Connection attempt failed ({}/{})",
            self.failed_attempts, self.max_failed_attempts
        ));
        debug!(
            "User {} connect failed ({}/{})",
            self.user_id, self.failed_attempts, self.max_failed_attempts
        );
        ConnectOutcome::Failed {
            failed_attempts: self.failed_attempts,
        }
    }

    /// Refresh a session's last activity
    ///
    /// Returns false, doing nothing, when the session is unknown or already
    /// expired at call time.
    pub fn update_session_activity(&mut self, session_id: &SessionId) -> bool {
        let now = self.time_source.now();
        let timeout = self.session_timeout;

        match self.sessions.get_mut(session_id) {
            Some(session) if !session.is_expired(now, timeout) => {
                session.touch(now);
            }
            _ => return false,
        }

        self.log_activity(format!("Session activity updated: {}", session_id));
        true
    }

    /// Remove every session that is expired at call time
    ///
    /// Returns the removed identifiers in sorted order. The connection state
    /// is left untouched.
    pub fn clean_expired_sessions(&mut self) -> Vec<SessionId> {
        let now = self.time_source.now();
        let timeout = self.session_timeout;

        let mut expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_expired(now, timeout))
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();

        for session_id in &expired {
            self.sessions.remove(session_id);
            self.log_activity(format!("Session expired: {}", session_id));
        }

        if !expired.is_empty() {
            info!(
                "Swept {} expired session(s) for user {}",
                expired.len(),
                self.user_id
            );
        }

        expired
    }

    /// Disconnect one session
    ///
    /// Returns false when the session is unknown or already inactive. When
    /// the stored set becomes empty the user becomes `Offline`. A blocked
    /// user stays locked out; only the displayed state changes.
    pub fn disconnect_session(&mut self, session_id: &SessionId) -> bool {
        let mut session = match self.sessions.remove(session_id) {
            Some(session) if session.is_active() => session,
            Some(session) => {
                self.sessions.insert(session_id.clone(), session);
                return false;
            }
            None => return false,
        };
        session.deactivate();

        self.log_activity(format!("Session disconnected: {}", session_id));

        if self.sessions.is_empty() {
            self.state = UserConnectionState::Offline;
        }

        info!(
            "User {} disconnected session {} ({} remaining)",
            self.user_id,
            session_id,
            self.sessions.len()
        );
        true
    }

    /// Clear the lockout and return to `Offline`
    ///
    /// Idempotent and allowed whether or not the user is blocked.
    pub fn reset_security_status(&mut self) {
        self.blocked = false;
        self.failed_attempts = 0;
        self.state = UserConnectionState::Offline;
        self.log_activity("Security status reset".to_string());
        info!("Security status reset for user {}", self.user_id);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn connection_state(&self) -> UserConnectionState {
        self.state
    }

    /// Sessions that are not expired right now; expired ones are not removed
    pub fn active_session_count(&self) -> usize {
        let now = self.time_source.now();
        self.sessions
            .values()
            .filter(|session| !session.is_expired(now, self.session_timeout))
            .count()
    }

    /// Stored sessions, including expired ones not yet swept
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, session_id: &SessionId) -> Option<&UserSession> {
        self.sessions.get(session_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &UserSession> {
        self.sessions.values()
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Copy of the formatted activity log, oldest first
    pub fn connection_logs(&self) -> Vec<String> {
        self.activity_log
            .iter()
            .map(|entry| entry.to_string())
            .collect()
    }

    /// Copy of the structured activity log, oldest first
    pub fn activity_entries(&self) -> Vec<ActivityEntry> {
        self.activity_log.snapshot()
    }

    /// Read-only view of the owned connection evaluator
    pub fn evaluator(&self) -> &ConnectionAttemptEvaluator<T> {
        &self.evaluator
    }

    /// Multi-line status summary
    pub fn connection_info(&self) -> String {
        format!(
            "User Connection Information:\n\
             User ID: {}\n\
             Username: {}\n\
             Connection State: {}\n\
             Active Sessions: {}\n\
             Failed Login Attempts: {}\n\
             Is Blocked: {}\n",
            self.user_id,
            self.username,
            self.state,
            self.sessions.len(),
            self.failed_attempts,
            self.blocked
        )
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn fresh_session_id(&self) -> SessionId {
        let now = self.time_source.now();
        loop {
            let candidate = SessionId::generate(now, &mut OsRng);
            if !self.sessions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn log_activity(&mut self, activity: String) {
        self.activity_log.append(ActivityEntry {
            timestamp: self.time_source.now(),
            username: self.username.clone(),
            activity,
        });
    }
}

impl<T: TimeSource + Clone> fmt::Debug for UserSessionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSessionManager")
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .field("failed_attempts", &self.failed_attempts)
            .field("blocked", &self.blocked)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
