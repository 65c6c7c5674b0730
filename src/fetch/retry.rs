use std::time::Duration;

/// How often and how patiently a comment request is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up. Treated as at least 1.
    pub max_attempts: u32,
    /// Fixed part of the pause after a failed attempt.
    pub base_delay: Duration,
    /// Upper bound of the random part added to `base_delay`.
    pub jitter: Duration,
    /// Fixed pause after a response arrives, before the next request goes out.
    pub settle_delay: Duration,
    /// Upper bound of the random part added to `settle_delay`.
    pub settle_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
            settle_delay: Duration::from_millis(500),
            settle_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            settle_delay: Duration::ZERO,
            settle_jitter: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause before the next attempt after a failure.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.base_delay + random_fraction(self.jitter)
    }

    /// Pause after a response has been received.
    #[must_use]
    pub fn settle(&self) -> Duration {
        self.settle_delay + random_fraction(self.settle_jitter)
    }
}

fn random_fraction(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    max.mul_f64(rand::random::<f64>())
}
