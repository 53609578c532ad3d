//! Bounded append-only logs
//!
//! Both the connection history and the user activity log are append-only.
//! Storage is capped: once `capacity` entries are held, appending rotates the
//! oldest entry out. The running total of appended entries is kept so callers
//! can tell how much was rotated away.

use alloc::collections::VecDeque;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Audit Log
// ----------------------------------------------------------------------------

/// Append-only log with a fixed retention capacity
#[derive(Debug, Clone)]
pub struct AuditLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
    total_appended: u64,
}

impl<T> AuditLog<T> {
    /// Create a log retaining at most `capacity` entries (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            total_appended: 0,
        }
    }

    /// Append an entry, rotating out the oldest one when full
    pub fn append(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.total_appended += 1;
    }

    /// Retained entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries ever appended, including rotated ones
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Entries dropped by rotation
    pub fn rotated(&self) -> u64 {
        self.total_appended - self.entries.len() as u64
    }
}

impl<T: Clone> AuditLog<T> {
    /// Copy of the retained entries, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

// ----------------------------------------------------------------------------
// Log Entry Types
// ----------------------------------------------------------------------------

/// One entry of a connection record's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub action: String,
    pub result: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Action: {}, Result: {}",
            self.timestamp, self.action, self.result
        )
    }
}

/// One entry of a user's activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: Timestamp,
    pub username: String,
    pub activity: String,
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] User: {} - {}",
            self.timestamp, self.username, self.activity
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
