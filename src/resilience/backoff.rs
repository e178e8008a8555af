//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

/// Jittered exponential backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay before retry number `attempt` (1-based). Attempt 0 waits nothing.
    ///
    /// The delay doubles per attempt, is capped at `max`, and gets up to 10%
    /// jitter on top.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(attempt - 1);
        let capped = self.base.saturating_mul(factor).min(self.max);

        let jitter_range = capped.as_millis() as u64 / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        capped + Duration::from_millis(jitter)
    }
}
