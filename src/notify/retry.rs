// src/notify/retry.rs
use std::time::Duration;

use rand::Rng;

/// Bounded retries with exponential backoff: base, 2·base, 4·base, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per message, including the first (at least 1).
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Draw each delay uniformly from [d/2, d] instead of using d.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let full = self.base_delay.saturating_mul(1u32 << shift);
        if !self.jitter || full.is_zero() {
            return full;
        }
        let hi = u64::try_from(full.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rng.random_range(hi / 2..=hi))
    }

    /// Backoff, raised to the platform's `retry_after` hint when that is longer.
    pub fn delay_for<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        retry_after: Option<u64>,
        rng: &mut R,
    ) -> Duration {
        let backoff = self.backoff(attempt, rng);
        match retry_after {
            Some(secs) => backoff.max(Duration::from_secs(secs)),
            None => backoff,
        }
    }
}
