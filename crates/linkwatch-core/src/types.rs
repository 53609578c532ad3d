//! Core types for the linkwatch connection core
//!
//! This module defines the identifiers and time primitives used throughout the
//! crate, using newtype patterns so that user, session and connection
//! identities cannot be mixed up.

use core::fmt;
use core::ops::{Add, Sub};
use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, other: Duration) -> Timestamp {
        let millis = u64::try_from(other.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, other: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(other.0))
    }
}

impl Timestamp {
    /// Create a new timestamp
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    /// Get the raw milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get duration since another timestamp (zero if `other` is later)
    pub fn duration_since(&self, other: Self) -> Duration {
        *self - other
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1000;
        let millis = self.0 % 1000;
        write!(f, "{}.{:03}", secs, millis)
    }
}

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Source of the current time
///
/// Every time-dependent decision in the crate (session expiry, log
/// timestamps, session identifiers) reads the clock through this trait so
/// tests can drive time explicitly.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp
    fn now(&self) -> Timestamp;
}

/// Standard library implementation of TimeSource
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

/// Unique identifier of one connection record, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one user session
///
/// Combines the creation time with a random suffix. Collisions are
/// practically impossible but the value carries no security meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Build a session identifier from a creation time and a random source
    pub fn generate<R: RngCore + ?Sized>(created_at: Timestamp, rng: &mut R) -> Self {
        let mut suffix = [0u8; 4];
        rng.fill_bytes(&mut suffix);
        Self(format!(
            "SESSION_{}_{}",
            created_at.as_millis(),
            hex::encode(suffix)
        ))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied user identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
