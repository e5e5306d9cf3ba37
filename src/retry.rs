use std::time::Duration;

use rand::Rng;

use crate::constants::*;

/// Bounded exponential backoff for transient trigger link failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive failures after which the link is reported as down.
    /// Retrying continues at `max_delay` afterwards.
    pub max_attempts: u32,
    /// Up to this fraction of the delay is added at random.
    pub jitter: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: RETRY_INITIAL_DELAY,
            max_delay: RETRY_MAX_DELAY,
            max_attempts: RETRY_MAX_ATTEMPTS,
            jitter: RETRY_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let mut rng = rand::rng();
        let extra = rng.random_range(0.0..=self.jitter);
        let extra = Duration::try_from_secs_f32(base.as_secs_f32() * extra).unwrap_or_default();
        base.saturating_add(extra)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}
