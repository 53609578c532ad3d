//! Error types for linkwatch
//!
//! Connection, session and lockout operations are total and never fail; a
//! rejected connect or an unknown session id is reported through the return
//! value. The errors below cover the edges around them: configuration and
//! user registration.

use thiserror::Error;

use crate::types::UserId;

/// Main error type for the linkwatch core
#[derive(Debug, Error)]
pub enum LinkwatchError {
    #[error("Invalid configuration: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("User not registered: {user_id}")]
    UserNotFound { user_id: UserId },

    #[error("User already registered: {user_id}")]
    UserAlreadyExists { user_id: UserId },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LinkwatchError {
    /// Create a configuration error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a user-not-found error
    pub fn user_not_found(user_id: &UserId) -> Self {
        Self::UserNotFound {
            user_id: user_id.clone(),
        }
    }
}

pub type Result<T> = core::result::Result<T, LinkwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LinkwatchError::config("lockout.max_failed_attempts", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: lockout.max_failed_attempts: must be at least 1"
        );

        let err = LinkwatchError::user_not_found(&UserId::new("u-1"));
        assert_eq!(err.to_string(), "User not registered: u-1");
    }
}
