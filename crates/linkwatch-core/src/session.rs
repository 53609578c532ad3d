//! User sessions
//!
//! A session records one connected device/address pairing. Expiry is a
//! read-time predicate over the last activity: nothing expires a session in
//! the background, the owning manager only discovers it on query or sweep.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{SessionId, Timestamp};

/// A single user session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    session_id: SessionId,
    ip_address: String,
    device_info: String,
    created_at: Timestamp,
    last_activity: Timestamp,
    active: bool,
}

impl UserSession {
    /// Open a new active session
    pub fn new(
        session_id: SessionId,
        ip_address: impl Into<String>,
        device_info: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            session_id,
            ip_address: ip_address.into(),
            device_info: device_info.into(),
            created_at: now,
            last_activity: now,
            active: true,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    /// Device description supplied at connect time (not interpreted)
    pub fn device_info(&self) -> &str {
        &self.device_info
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Expired iff `now` is strictly later than `last_activity + timeout`
    pub fn is_expired(&self, now: Timestamp, timeout: Duration) -> bool {
        now > self.last_activity + timeout
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self, now: Timestamp) -> Duration {
        now.duration_since(self.last_activity)
    }

    pub(crate) fn touch(&mut self, now: Timestamp) {
        self.last_activity = now;
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }
}
