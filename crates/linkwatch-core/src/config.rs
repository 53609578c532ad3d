//! Centralized Configuration Management
//!
//! This module consolidates the policy constants of the connection core
//! (retry ceiling, lockout threshold, session timeout, log capacity) into
//! serializable configuration structs with named presets.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{LinkwatchError, Result};

// ----------------------------------------------------------------------------
// Evaluator Configuration
// ----------------------------------------------------------------------------

/// Configuration for connection attempt evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Probability that a simulated attempt succeeds
    pub success_probability: f64,
    /// Lower bound (inclusive) of the simulated throughput in Mbps
    pub min_throughput_mbps: f64,
    /// Upper bound (exclusive) of the simulated throughput in Mbps
    pub max_throughput_mbps: f64,
    /// Probability that a successful attempt negotiates a secure transport
    pub secure_probability: f64,
    /// Retry count at which `has_reached_max_retries` reports true
    pub max_retries: u32,
    /// Simulated dial pause applied before every attempt
    pub dial_delay: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            success_probability: 0.7,
            min_throughput_mbps: 10.0,
            max_throughput_mbps: 100.0,
            secure_probability: 0.9,
            max_retries: 3,
            dial_delay: Duration::ZERO,
        }
    }
}

impl EvaluatorConfig {
    /// Create a configuration for high-security environments
    pub fn strict() -> Self {
        Self {
            max_retries: 2,
            secure_probability: 1.0,
            ..Self::default()
        }
    }
}

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Configuration for session lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity window after which a session counts as expired
    pub session_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

impl SessionConfig {
    /// Create a configuration for high-security environments
    pub fn strict() -> Self {
        Self {
            session_timeout: Duration::from_secs(10 * 60),
        }
    }
}

// ----------------------------------------------------------------------------
// Lockout Configuration
// ----------------------------------------------------------------------------

/// Configuration for the failed-attempt lockout policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Number of failed connects after which the user is blocked
    pub max_failed_attempts: u32,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
        }
    }
}

impl LockoutConfig {
    /// Create a configuration for high-security environments
    pub fn strict() -> Self {
        Self {
            max_failed_attempts: 3,
        }
    }
}

// ----------------------------------------------------------------------------
// Audit Configuration
// ----------------------------------------------------------------------------

/// Capacity of the in-memory activity and history logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum retained entries per log; older entries are rotated out
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}

impl AuditConfig {
    /// Create a configuration optimized for testing
    pub fn testing() -> Self {
        Self { max_entries: 100 }
    }
}

// ----------------------------------------------------------------------------
// Main Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for a linkwatch user context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkwatchConfig {
    pub evaluator: EvaluatorConfig,
    pub session: SessionConfig,
    pub lockout: LockoutConfig,
    pub audit: AuditConfig,
}

impl LinkwatchConfig {
    /// Create configuration for high-security environments
    pub fn strict() -> Self {
        Self {
            evaluator: EvaluatorConfig::strict(),
            session: SessionConfig::strict(),
            lockout: LockoutConfig::strict(),
            audit: AuditConfig::default(),
        }
    }

    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            evaluator: EvaluatorConfig::default(),
            session: SessionConfig::default(),
            lockout: LockoutConfig::default(),
            audit: AuditConfig::testing(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: EvaluatorConfig) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_lockout(mut self, lockout: LockoutConfig) -> Self {
        self.lockout = lockout;
        self
    }

    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        let evaluator = &self.evaluator;

        check_probability("evaluator.success_probability", evaluator.success_probability)?;
        check_probability("evaluator.secure_probability", evaluator.secure_probability)?;

        if !(evaluator.min_throughput_mbps >= 0.0
            && evaluator.min_throughput_mbps < evaluator.max_throughput_mbps)
        {
            return Err(LinkwatchError::config(
                "evaluator.min_throughput_mbps",
                "must be non-negative and below max_throughput_mbps",
            ));
        }
        if evaluator.max_retries == 0 {
            return Err(LinkwatchError::config(
                "evaluator.max_retries",
                "must be at least 1",
            ));
        }
        if self.session.session_timeout.is_zero() {
            return Err(LinkwatchError::config(
                "session.session_timeout",
                "must be greater than zero",
            ));
        }
        if self.lockout.max_failed_attempts == 0 {
            return Err(LinkwatchError::config(
                "lockout.max_failed_attempts",
                "must be at least 1",
            ));
        }
        if self.audit.max_entries == 0 {
            return Err(LinkwatchError::config(
                "audit.max_entries",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn check_probability(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LinkwatchError::config(field, "must be within [0, 1]"))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = LinkwatchConfig::default();
        assert_eq!(config.evaluator.success_probability, 0.7);
        assert_eq!(config.evaluator.max_retries, 3);
        assert_eq!(config.session.session_timeout, Duration::from_secs(1800));
        assert_eq!(config.lockout.max_failed_attempts, 5);
        assert_eq!(config.audit.max_entries, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(LinkwatchConfig::strict().validate().is_ok());
        assert!(LinkwatchConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_testing_preset_only_shrinks_audit_logs() {
        let testing = LinkwatchConfig::testing();
        let default = LinkwatchConfig::default();

        assert_eq!(testing.evaluator, default.evaluator);
        assert_eq!(testing.session, default.session);
        assert_eq!(testing.lockout, default.lockout);
        assert!(testing.audit.max_entries < default.audit.max_entries);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = LinkwatchConfig::default().with_evaluator(EvaluatorConfig {
            success_probability: 1.5,
            ..EvaluatorConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(LinkwatchError::Config { ref field, .. }) if field == "evaluator.success_probability"
        ));

        let config = LinkwatchConfig::default().with_evaluator(EvaluatorConfig {
            min_throughput_mbps: 100.0,
            max_throughput_mbps: 10.0,
            ..EvaluatorConfig::default()
        });
        assert!(config.validate().is_err());

        let config = LinkwatchConfig::default().with_lockout(LockoutConfig {
            max_failed_attempts: 0,
        });
        assert!(config.validate().is_err());

        let config = LinkwatchConfig::default().with_audit(AuditConfig { max_entries: 0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_with_partial_input() {
        let config = LinkwatchConfig::from_json(r#"{ "lockout": { "max_failed_attempts": 7 } }"#)
            .unwrap();
        assert_eq!(config.lockout.max_failed_attempts, 7);
        assert_eq!(config.evaluator, EvaluatorConfig::default());

        let json = config.to_json().unwrap();
        assert_eq!(LinkwatchConfig::from_json(&json).unwrap(), config);
    }
}
