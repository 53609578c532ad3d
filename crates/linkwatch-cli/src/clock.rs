//! Simulated clock for scenario playback

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linkwatch_core::{TimeSource, Timestamp};

/// Clock that only moves when a scenario steps it
///
/// Starts at the current wall-clock time so log timestamps look real, then
/// advances in jumps so an idle period does not have to be waited out.
#[derive(Debug, Clone)]
pub struct SteppedClock {
    millis: Arc<AtomicU64>,
}

impl SteppedClock {
    pub fn starting_now() -> Self {
        Self::starting_at(Timestamp::now())
    }

    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start.as_millis())),
        }
    }

    pub fn step(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(millis))
            });
    }
}

impl TimeSource for SteppedClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.millis.load(Ordering::SeqCst))
    }
}
