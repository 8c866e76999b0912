/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Exponential backoff for out-of-band retries.
//!
//! The delay before retry `n` (zero-based) is `base * 2^n`, capped at `max`.
//! After `max_retries` consecutive failures no further retry is offered; the
//! poller's regular cadence keeps running regardless.

use std::time::Duration;

use crate::config::BackoffConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    max_retries: u32,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_retries: u32) -> Self {
        Self {
            base,
            max: max.max(base),
            max_retries,
            failures: 0,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_ms),
            Duration::from_millis(config.max_ms),
            config.max_retries,
        )
    }

    /// Delay before the zero-based retry `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Record a failed fetch and return the delay before the out-of-band
    /// retry, or `None` once the retry budget is spent.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.failures > self.max_retries {
            return None;
        }
        Some(self.delay_for(self.failures - 1))
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(Duration::from_millis(500), Duration::from_secs(8), 8)
    }

    #[test]
    fn test_delays_double_until_capped() {
        let mut backoff = backoff();
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.record_failure())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000, 8000, 8000, 8000]);
    }

    #[test]
    fn test_delays_are_non_decreasing_and_capped() {
        for max_retries in [1u32, 3, 10, 40] {
            let mut backoff = Backoff::new(Duration::from_millis(250), Duration::from_secs(30), max_retries);
            let mut previous = Duration::ZERO;
            let mut count = 0;
            while let Some(delay) = backoff.record_failure() {
                assert!(delay >= previous, "{delay:?} < {previous:?}");
                assert!(delay <= Duration::from_secs(30));
                previous = delay;
                count += 1;
            }
            assert_eq!(count, max_retries);
        }
    }

    #[test]
    fn test_budget_exhaustion_and_reset() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4), 2);
        assert_eq!(backoff.record_failure(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.record_failure(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.record_failure(), None);
        assert_eq!(backoff.failures(), 3);

        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.record_failure(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_huge_attempts_saturate_at_max() {
        let backoff = backoff();
        assert_eq!(backoff.delay_for(31), Duration::from_secs(8));
        assert_eq!(backoff.delay_for(200), Duration::from_secs(8));
    }

    #[test]
    fn test_zero_retries_never_schedules() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4), 0);
        assert_eq!(backoff.record_failure(), None);
        assert_eq!(backoff.failures(), 1);
    }
}
