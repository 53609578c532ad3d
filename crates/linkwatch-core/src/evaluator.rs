//! Connection attempt evaluation
//!
//! The `ConnectionAttemptEvaluator` is the record of one logical connection
//! channel. It asks its probe to dial a target, tracks how many attempts went
//! to each target, counts failures against a retry ceiling and keeps an
//! append-only history of what happened.

use core::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit::{AuditLog, HistoryEntry};
use crate::config::LinkwatchConfig;
use crate::probe::AttemptProbe;
use crate::types::{ConnectionId, TimeSource, Timestamp};

// ----------------------------------------------------------------------------
// Connection Status
// ----------------------------------------------------------------------------

/// Status of a connection record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Created, no attempt yet
    Initialized,
    /// Last attempt succeeded
    Connected,
    /// Last attempt failed
    Failed,
    /// Explicitly reset
    Reset,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Initialized => "INITIALIZED",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Failed => "FAILED",
            ConnectionStatus::Reset => "RESET",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Connection Statistics
// ----------------------------------------------------------------------------

/// Read-only snapshot of a connection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub connection_id: ConnectionId,
    pub status: ConnectionStatus,
    pub created_at: Timestamp,
    pub retry_count: u32,
    pub speed_mbps: f64,
    pub secure: bool,
}

impl fmt::Display for ConnectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connection Statistics:")?;
        writeln!(f, "ID: {}", self.connection_id)?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Connection Time: {}", self.created_at)?;
        writeln!(f, "Retry Count: {}", self.retry_count)?;
        writeln!(f, "Connection Speed: {:.2} Mbps", self.speed_mbps)?;
        writeln!(f, "Secure Connection: {}", self.secure)
    }
}

// ----------------------------------------------------------------------------
// Connection Attempt Evaluator
// ----------------------------------------------------------------------------

/// Evaluates connection attempts and keeps the per-channel connection record
pub struct ConnectionAttemptEvaluator<T: TimeSource> {
    connection_id: ConnectionId,
    created_at: Timestamp,
    status: ConnectionStatus,
    retry_count: u32,
    max_retries: u32,
    /// Attempts per target; only ever incremented
    attempts_by_target: HashMap<String, u32>,
    speed_mbps: f64,
    secure: bool,
    history: AuditLog<HistoryEntry>,
    probe: Box<dyn AttemptProbe>,
    time_source: T,
}

impl<T: TimeSource> ConnectionAttemptEvaluator<T> {
    /// Create an evaluator with the default configuration
    pub fn new(probe: Box<dyn AttemptProbe>, time_source: T) -> Self {
        Self::with_config(&LinkwatchConfig::default(), probe, time_source)
    }

    /// Create an evaluator with a custom configuration
    pub fn with_config(
        config: &LinkwatchConfig,
        probe: Box<dyn AttemptProbe>,
        time_source: T,
    ) -> Self {
        let created_at = time_source.now();
        Self {
            connection_id: ConnectionId::generate(),
            created_at,
            status: ConnectionStatus::Initialized,
            retry_count: 0,
            max_retries: config.evaluator.max_retries,
            attempts_by_target: HashMap::new(),
            speed_mbps: 0.0,
            secure: false,
            history: AuditLog::with_capacity(config.audit.max_entries),
            probe,
            time_source,
        }
    }

    /// Run one attempt against `target` and record the outcome
    ///
    /// Never fails: a failed dial is reported as `false` with the retry
    /// counter advanced. Nothing stops further attempts once the retry
    /// ceiling is reached; callers consult [`Self::has_reached_max_retries`].
    pub fn attempt(&mut self, target: &str) -> bool {
        let outcome = self.probe.dial(target);

        let attempts = self
            .attempts_by_target
            .entry(target.to_string())
            .or_insert(0);
        *attempts = attempts.saturating_add(1);

        if outcome.success {
            self.status = ConnectionStatus::Connected;
            self.speed_mbps = outcome.throughput_mbps;
            self.secure = outcome.secure;
            self.record("CONNECT", "Success".to_string());
            debug!(
                "Connection {} to {} succeeded ({:.2} Mbps, secure: {})",
                self.connection_id, target, self.speed_mbps, self.secure
            );
        } else {
            self.retry_count = self.retry_count.saturating_add(1);
            self.status = ConnectionStatus::Failed;
            self.record("CONNECT", format!("Failed - Attempt {}", self.retry_count));
            debug!(
                "Connection {} to {} failed (retry {}/{})",
                self.connection_id, target, self.retry_count, self.max_retries
            );
        }

        outcome.success
    }

    /// Whether the failure count has reached the retry ceiling
    pub fn has_reached_max_retries(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Clear status, retry count and link quality
    ///
    /// Per-target attempt counts are kept.
    pub fn reset(&mut self) {
        self.status = ConnectionStatus::Reset;
        self.retry_count = 0;
        self.speed_mbps = 0.0;
        self.secure = false;
        self.record("RESET", "Connection reset successful".to_string());
        info!("Connection {} reset", self.connection_id);
    }

    /// Snapshot for diagnostics
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            connection_id: self.connection_id,
            status: self.status,
            created_at: self.created_at,
            retry_count: self.retry_count,
            speed_mbps: self.speed_mbps,
            secure: self.secure,
        }
    }

    /// Formatted history lines, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.iter().map(|entry| entry.to_string()).collect()
    }

    /// Structured history entries, oldest first
    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        self.history.snapshot()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Throughput of the last successful attempt; meaningful while connected
    pub fn speed_mbps(&self) -> f64 {
        self.speed_mbps
    }

    /// Transport security of the last successful attempt; meaningful while connected
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Attempts made against `target` so far
    pub fn attempts_for(&self, target: &str) -> u32 {
        self.attempts_by_target.get(target).copied().unwrap_or(0)
    }

    /// Attempts summed over every target
    pub fn total_attempts(&self) -> u64 {
        self.attempts_by_target.values().map(|&n| n as u64).sum()
    }

    fn record(&mut self, action: &str, result: String) {
        self.history.append(HistoryEntry {
            timestamp: self.time_source.now(),
            action: action.to_string(),
            result,
        });
    }
}

impl<T: TimeSource> fmt::Debug for ConnectionAttemptEvaluator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAttemptEvaluator")
            .field("connection_id", &self.connection_id)
            .field("status", &self.status)
            .field("retry_count", &self.retry_count)
            .field("attempts_by_target", &self.attempts_by_target)
            .field("speed_mbps", &self.speed_mbps)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
