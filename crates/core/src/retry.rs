//! Bounded exponential-backoff policy for calls to the prediction service.
//!
//! The policy only decides *whether* and *how long*; the async loop that
//! sleeps and re-issues requests lives in `tryon_vertex::api`.

use std::time::Duration;

/// HTTP statuses worth another attempt: rate limiting and transient
/// upstream failures.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Tunable parameters for the retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Upper bound on any single delay, including server-requested ones.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given ceiling and base delay in (fractional) seconds.
    ///
    /// Negative or non-finite `backoff_secs` are treated as zero; values
    /// beyond [`RetryPolicy::max_delay`] are clamped to it.
    pub fn new(max_retries: u32, backoff_secs: f64) -> Self {
        let defaults = Self::default();
        let secs = if backoff_secs.is_finite() {
            backoff_secs.clamp(0.0, defaults.max_delay.as_secs_f64())
        } else {
            0.0
        };
        Self {
            max_retries,
            initial_delay: Duration::from_secs_f64(secs),
            ..defaults
        }
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `attempt` (zero-based), clamped to `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Delay to use when the server asked for `retry_after`.
    ///
    /// The longer of the computed backoff and the server hint wins, still
    /// capped at `max_delay`.
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.delay_for_attempt(attempt);
        match retry_after {
            Some(hint) => computed.max(hint).min(self.max_delay),
            None => computed,
        }
    }
}

/// Whether an HTTP status code should be retried.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}
