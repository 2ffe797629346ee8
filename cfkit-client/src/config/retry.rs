//! Retry policy and backoff for [`RetryRequest`](crate::RetryRequest).
//!
//! The default policy resends a transient failure twice, immediately. A
//! delay between attempts is opt-in: set a non-zero
//! [`base_delay`](RetryPolicy::base_delay) to get exponential backoff with
//! optional jitter.
//!
//! # Example
//!
//! ```
//! use cfkit_client::RetryPolicy;
//! use std::time::Duration;
//!
//! // Two immediate retries
//! let policy = RetryPolicy::default();
//!
//! // Backoff starting at 100ms, doubling, capped at 2s
//! let policy = RetryPolicy::new()
//!     .max_retries(4)
//!     .base_delay(Duration::from_millis(100))
//!     .multiplier(2.0)
//!     .max_delay(Duration::from_secs(2));
//! ```

use std::time::Duration;

/// Values [`RetryPolicy::default`] starts from.
pub mod defaults {
    use std::time::Duration;

    pub const BASE_DELAY: Duration = Duration::ZERO;
    pub const MULTIPLIER: f64 = 1.6;
    pub const JITTER: f64 = 0.0;
    pub const MAX_DELAY: Duration = Duration::from_secs(30);
    /// Resends after the first attempt.
    pub const MAX_RETRIES: u32 = 2;
}

/// A [`RetryPolicy`] that cannot be used.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid retry policy: {0}")]
pub struct InvalidRetryPolicy(pub &'static str);

/// How often a transient failure is resent and how long to wait in between.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Wait before the first resend. Zero resends immediately.
    pub base_delay: Duration,
    /// Growth of the wait per resend, at least 1.0.
    pub multiplier: f64,
    /// Fraction in `0.0..=1.0` by which each wait is randomly widened or shortened.
    pub jitter: f64,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
    /// Resends after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: defaults::BASE_DELAY,
            multiplier: defaults::MULTIPLIER,
            jitter: defaults::JITTER,
            max_delay: defaults::MAX_DELAY,
            max_retries: defaults::MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Reject settings that would make [`Backoff`] misbehave.
    pub fn validate(&self) -> Result<(), InvalidRetryPolicy> {
        if self.base_delay > self.max_delay {
            return Err(InvalidRetryPolicy("base_delay must not exceed max_delay"));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(InvalidRetryPolicy("multiplier must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(InvalidRetryPolicy("jitter must be between 0.0 and 1.0"));
        }
        Ok(())
    }

    /// Fresh retry state for one request.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next_secs: self.base_delay.as_secs_f64(),
            policy: self.clone(),
            given: 0,
        }
    }
}

/// Retry budget and waits of a single request.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    next_secs: f64,
    given: u32,
}

impl Backoff {
    /// Resends handed out so far.
    pub fn attempts(&self) -> u32 {
        self.given
    }

    pub fn can_retry(&self) -> bool {
        self.given < self.policy.max_retries
    }

    /// Take the wait before the next resend.
    pub fn next_delay(&mut self) -> Duration {
        let cap = self.policy.max_delay.as_secs_f64();
        let wait = self.next_secs;
        self.next_secs = (wait * self.policy.multiplier).min(cap);
        self.given += 1;

        let spread = if self.policy.jitter > 0.0 {
            self.policy.jitter * (2.0 * rand::random::<f64>() - 1.0)
        } else {
            0.0
        };
        Duration::from_secs_f64((wait * (1.0 + spread)).clamp(0.0, cap))
    }
}
