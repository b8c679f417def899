//! # Retry
//!
//! Module dedicated to the bounded exponential backoff wrapped around
//! [`ThreadedSender::send_threaded`](crate::sender::ThreadedSender::send_threaded).

use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub attempts: u8,

    /// Delay before the second attempt, doubled before each next one.
    pub base_delay: Duration,

    /// Upper bound of the delay between two attempts.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Return the delay to wait after the given failed attempt
    /// (starting at 0).
    pub fn delay(&self, attempt: u8) -> Duration {
        let factor = 2u32.saturating_pow(attempt.into());
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// The retry state, tracking attempts made so far.
#[derive(Debug, Default)]
pub struct Retry {
    config: RetryConfig,
    pub attempts: u8,
}

/// The outcome of a failed attempt.
#[derive(Debug, Eq, PartialEq)]
pub enum RetryState {
    /// Wait for the given delay, then retry.
    Retry(Duration),

    /// All attempts have been made.
    Exhausted,
}

impl Retry {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Register a failed attempt.
    pub fn next(&mut self) -> RetryState {
        let attempt = self.attempts;
        self.attempts = self.attempts.saturating_add(1);

        if self.attempts < self.config.attempts {
            RetryState::Retry(self.config.delay(attempt))
        } else {
            RetryState::Exhausted
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Retry, RetryConfig, RetryState};

    #[test]
    fn exponential_delay() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));

        assert_eq!(config.delay(0), Duration::from_secs(1));
        assert_eq!(config.delay(1), Duration::from_secs(2));
        assert_eq!(config.delay(2), Duration::from_secs(4));
        assert_eq!(config.delay(3), Duration::from_secs(5));
        assert_eq!(config.delay(200), Duration::from_secs(5));
    }

    #[test]
    fn bounded_attempts() {
        let mut retry = Retry::new(RetryConfig::default().with_attempts(3));

        assert_eq!(retry.next(), RetryState::Retry(Duration::from_secs(1)));
        assert_eq!(retry.next(), RetryState::Retry(Duration::from_secs(2)));
        assert_eq!(retry.next(), RetryState::Exhausted);

        retry.reset();
        assert_eq!(retry.attempts, 0);
    }
}
