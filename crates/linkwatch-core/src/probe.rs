//! Connection attempt probes
//!
//! A probe performs the actual dial against a target and reports whether it
//! succeeded, along with the measured throughput and whether the transport
//! was secured. The evaluator only records what the probe reports, so a
//! simulated probe, a scripted test probe or a real transport check can be
//! plugged in interchangeably.

use alloc::collections::VecDeque;
use core::time::Duration;

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::EvaluatorConfig;

// ----------------------------------------------------------------------------
// Attempt Outcome
// ----------------------------------------------------------------------------

/// Result of a single dial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub success: bool,
    /// Measured throughput in Mbps, zero on failure
    pub throughput_mbps: f64,
    /// Whether a secure transport was negotiated, false on failure
    pub secure: bool,
}

impl AttemptOutcome {
    /// A successful dial with the given quality
    pub fn connected(throughput_mbps: f64, secure: bool) -> Self {
        Self {
            success: true,
            throughput_mbps: throughput_mbps.max(0.0),
            secure,
        }
    }

    /// A failed dial
    pub fn failed() -> Self {
        Self {
            success: false,
            throughput_mbps: 0.0,
            secure: false,
        }
    }
}

// ----------------------------------------------------------------------------
// Probe Trait
// ----------------------------------------------------------------------------

/// Performs one connection attempt against a target address
pub trait AttemptProbe: Send {
    /// Dial `target` and report the outcome. Must not panic.
    fn dial(&mut self, target: &str) -> AttemptOutcome;
}

impl<P: AttemptProbe + ?Sized> AttemptProbe for Box<P> {
    fn dial(&mut self, target: &str) -> AttemptOutcome {
        (**self).dial(target)
    }
}

// ----------------------------------------------------------------------------
// Delay
// ----------------------------------------------------------------------------

/// Blocking pause used to model transport latency
pub trait Delay: Send + Sync {
    fn pause(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn pause(&self, _duration: Duration) {}
}

// ----------------------------------------------------------------------------
// Random Probe
// ----------------------------------------------------------------------------

/// Simulated dial driven by a random source
///
/// Succeeds with `success_probability`; a successful dial reports a
/// throughput drawn uniformly from `[min_throughput_mbps, max_throughput_mbps)`
/// and a secure transport with `secure_probability`.
pub struct RandomProbe<R: RngCore + Send = OsRng> {
    rng: R,
    success_probability: f64,
    min_throughput_mbps: f64,
    max_throughput_mbps: f64,
    secure_probability: f64,
    dial_delay: Duration,
    delay: Box<dyn Delay>,
}

impl RandomProbe<OsRng> {
    /// Create a probe backed by the operating system RNG
    pub fn from_entropy(config: &EvaluatorConfig) -> Self {
        Self::with_rng(config, OsRng)
    }
}

impl<R: RngCore + Send> RandomProbe<R> {
    /// Create a probe backed by the given RNG
    pub fn with_rng(config: &EvaluatorConfig, rng: R) -> Self {
        Self {
            rng,
            success_probability: config.success_probability,
            min_throughput_mbps: config.min_throughput_mbps,
            max_throughput_mbps: config.max_throughput_mbps,
            secure_probability: config.secure_probability,
            dial_delay: config.dial_delay,
            delay: Box::new(ThreadDelay),
        }
    }

    /// Replace the pause implementation used for `dial_delay`
    pub fn with_delay(mut self, delay: impl Delay + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Uniform draw in [0, 1)
    fn next_unit(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl<R: RngCore + Send> AttemptProbe for RandomProbe<R> {
    fn dial(&mut self, _target: &str) -> AttemptOutcome {
        if !self.dial_delay.is_zero() {
            self.delay.pause(self.dial_delay);
        }

        if self.next_unit() >= self.success_probability {
            return AttemptOutcome::failed();
        }

        let span = self.max_throughput_mbps - self.min_throughput_mbps;
        let throughput = self.min_throughput_mbps + self.next_unit() * span;
        let secure = self.next_unit() < self.secure_probability;

        AttemptOutcome::connected(throughput, secure)
    }
}

// ----------------------------------------------------------------------------
// Deterministic Probes
// ----------------------------------------------------------------------------

/// Always reports the same outcome
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe {
    outcome: AttemptOutcome,
}

impl FixedProbe {
    pub fn new(outcome: AttemptOutcome) -> Self {
        Self { outcome }
    }

    /// Probe whose every dial succeeds with a secure 50 Mbps link
    pub fn succeeding() -> Self {
        Self::new(AttemptOutcome::connected(50.0, true))
    }

    /// Probe whose every dial fails
    pub fn failing() -> Self {
        Self::new(AttemptOutcome::failed())
    }
}

impl AttemptProbe for FixedProbe {
    fn dial(&mut self, _target: &str) -> AttemptOutcome {
        self.outcome
    }
}

/// Replays a queue of outcomes, then falls back to a default
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    script: VecDeque<AttemptOutcome>,
    fallback: AttemptOutcome,
}

impl ScriptedProbe {
    /// Create a probe that replays `script` and fails once it runs out
    pub fn new(script: impl IntoIterator<Item = AttemptOutcome>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: AttemptOutcome::failed(),
        }
    }

    /// Build a script from plain success flags
    pub fn from_results(results: impl IntoIterator<Item = bool>) -> Self {
        Self::new(results.into_iter().map(|ok| {
            if ok {
                AttemptOutcome::connected(50.0, true)
            } else {
                AttemptOutcome::failed()
            }
        }))
    }

    /// Outcome used once the script is exhausted
    pub fn with_fallback(mut self, fallback: AttemptOutcome) -> Self {
        self.fallback = fallback;
        self
    }

    /// Outcomes still queued
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl AttemptProbe for ScriptedProbe {
    fn dial(&mut self, _target: &str) -> AttemptOutcome {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
