//! Retry and backoff policy for page requests.
//!
//! Two budgets apply to a single page request. Rate-limited responses wait
//! for the delay GitHub advertises and get their own attempt budget. Every
//! other failure (non-rate-limit 4xx, 5xx, timeouts, connection errors) is
//! retried with exponential backoff.

use rand::Rng;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum attempts for a request failing with non-rate-limit errors.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for a backoff delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Jitter factor to add randomness (0.0 to 1.0).
    pub jitter_factor: f64,
    /// Maximum requests made while rate limited.
    pub max_rate_limit_attempts: u32,
    /// Upper bound for a single rate limit wait.
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            max_rate_limit_attempts: 5,
            max_rate_limit_wait: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Sets the attempt budget for non-rate-limit failures.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum backoff delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the attempt budget for rate-limited responses.
    pub fn with_max_rate_limit_attempts(mut self, attempts: u32) -> Self {
        self.max_rate_limit_attempts = attempts.max(1);
        self
    }

    /// Sets the maximum time to wait for a rate limit reset.
    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    /// Disables jitter, making delays deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64;
        let exponential_delay =
            base_delay * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let jitter = if self.jitter_factor > 0.0 && exponential_delay > 0.0 {
            let jitter_amount = exponential_delay * self.jitter_factor;
            rand::thread_rng().gen_range(-jitter_amount..=jitter_amount)
        } else {
            0.0
        };

        let final_delay = (exponential_delay + jitter).max(0.0);
        let capped_delay = final_delay.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_delay as u64)
    }

    /// Wait before retrying a rate-limited request, given GitHub's hint.
    ///
    /// The hint is capped by `max_rate_limit_wait`. A zero hint falls back to
    /// the initial backoff delay.
    pub fn rate_limit_delay(&self, hint: Duration) -> Duration {
        if hint.is_zero() {
            return self.initial_delay.min(self.max_rate_limit_wait);
        }
        hint.min(self.max_rate_limit_wait)
    }
}
