//! Linkwatch Core
//!
//! Models the lifecycle of a user's network connection and the sessions it
//! spawns: connection attempts with a retry ceiling, per-session activity
//! tracking with inactivity expiry, and an account lockout triggered by
//! repeated failures.
//!
//! - [`evaluator::ConnectionAttemptEvaluator`] decides single attempts through
//!   a pluggable [`probe::AttemptProbe`] and keeps the connection record.
//! - [`manager::UserSessionManager`] owns one user's connection state
//!   machine, sessions, lockout counters and activity log.
//! - [`registry::SessionRegistry`] holds many users and serializes access to
//!   each of them.

extern crate alloc;

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod audit;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod manager;
pub mod probe;
pub mod registry;
pub mod session;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use audit::{ActivityEntry, AuditLog, HistoryEntry};
pub use config::{AuditConfig, EvaluatorConfig, LinkwatchConfig, LockoutConfig, SessionConfig};
pub use errors::{LinkwatchError, Result};
pub use evaluator::{ConnectionAttemptEvaluator, ConnectionStats, ConnectionStatus};
pub use manager::{ConnectOutcome, UserConnectionState, UserSessionManager};
pub use probe::{
    AttemptOutcome, AttemptProbe, Delay, FixedProbe, NoDelay, RandomProbe, ScriptedProbe,
    ThreadDelay,
};
pub use registry::{ProbeFactory, SessionRegistry, SharedContext};
pub use session::UserSession;
pub use types::{ConnectionId, SessionId, SystemTimeSource, TimeSource, Timestamp, UserId};
