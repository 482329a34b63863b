//! Exponential backoff shared by the HTTP fetch layer and the AI call.

use rand::Rng;
use std::time::Duration;

/// Backoff schedule: `delay(n) = min(base * 2^(n-1), cap)`, optionally
/// spread by `±jitter` (fraction of the delay).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Option<Duration>,
    /// 0.25 means the actual delay is uniformly drawn from [0.75·d, 1.25·d].
    pub jitter: f64,
}

impl RetryPolicy {
    /// Portal fetches: 3 attempts, 1s base, 16s cap, ±25% jitter.
    pub fn http_default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(1),
            cap: Some(Duration::from_secs(16)),
            jitter: 0.25,
        }
    }

    /// AI calls: 1s, 2s, 4s… with no jitter.
    pub fn ai_default(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base: Duration::from_secs(1),
            cap: None,
            jitter: 0.0,
        }
    }

    /// Same schedule without any waiting; used by tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base: Duration::ZERO,
            cap: None,
            jitter: 0.0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Un-jittered delay after the `attempt`-th failure (1-based).
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        let raw = self.base.saturating_mul(1u32 << exp);
        match self.cap {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    /// Delay after the `attempt`-th failure with jitter applied.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt);
        if self.jitter <= 0.0 || nominal.is_zero() {
            return nominal;
        }
        let spread = self.jitter.min(1.0);
        let factor = 1.0 + rand::rng().random_range(-spread..=spread);
        nominal.mul_f64(factor.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_delays_double_and_respect_cap() {
        let p = RetryPolicy::http_default();
        assert_eq!(p.nominal_delay(1), Duration::from_secs(1));
        assert_eq!(p.nominal_delay(2), Duration::from_secs(2));
        assert_eq!(p.nominal_delay(3), Duration::from_secs(4));
        assert_eq!(p.nominal_delay(10), Duration::from_secs(16));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        let p = RetryPolicy::http_default();
        for _ in 0..200 {
            let d = p.delay_for(3).as_secs_f64();
            assert!((3.0..=5.0).contains(&d), "delay {d} outside ±25% of 4s");
        }
    }

    #[test]
    fn ai_schedule_has_no_jitter() {
        let p = RetryPolicy::ai_default(4);
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }
}
