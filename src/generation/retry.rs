//! Retry Policy
//!
//! Exponential backoff for transient generation failures. The policy only
//! decides; the client owns the attempt loop and the actual sleeping.

use std::time::Duration;

use crate::constants::retry as retry_constants;
use crate::types::ClassifiedError;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per logical request (first attempt included)
    pub max_attempts: u32,
    /// Base delay before the second attempt
    pub base_delay: Duration,
    /// Cap applied to computed delays
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_constants::DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
        }
    }
}

/// Decides whether and how long to wait between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Whether another attempt is permitted after `attempt` attempts have
    /// been made and the latest failed with `last_error`.
    pub fn should_retry(&self, attempt: u32, last_error: &ClassifiedError) -> bool {
        attempt < self.config.max_attempts && last_error.retryable
    }

    /// Backoff before the attempt following attempt number `attempt`:
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`. The first
    /// attempt is immediate; callers only consult this for attempts ≥ 2.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 2u32.saturating_pow(exponent);
        let delay = self.config.base_delay.saturating_mul(factor);
        delay.min(self.config.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Per-call attempt tracking. Created at call entry, discarded at call exit;
/// never shared across calls.
#[derive(Debug, Default)]
pub(crate) struct RetryState {
    pub attempt: u32,
    pub last_error: Option<ClassifiedError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_should_retry_respects_attempt_budget() {
        let policy = RetryPolicy::default();
        let err = ClassifiedError::new(ErrorKind::Server, "boom");

        assert!(policy.should_retry(1, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
    }

    #[test]
    fn test_should_retry_respects_retryability() {
        let policy = RetryPolicy::default();
        let terminal = ClassifiedError::new(ErrorKind::Authentication, "denied");

        assert!(!policy.should_retry(1, &terminal));
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        });

        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 20,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        });

        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        // Huge attempt numbers must not overflow
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[cfg(test)]
    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn delay_is_monotone_in_attempt(
                base_ms in 1u64..5_000,
                attempt in 1u32..16,
            ) {
                let policy = RetryPolicy::new(RetryConfig {
                    max_attempts: 32,
                    base_delay: Duration::from_millis(base_ms),
                    max_delay: Duration::from_secs(3600),
                });
                prop_assert!(policy.delay_for(attempt + 1) >= policy.delay_for(attempt));
            }

            #[test]
            fn delay_never_exceeds_cap(
                base_ms in 1u64..100_000,
                attempt in 1u32..64,
            ) {
                let policy = RetryPolicy::new(RetryConfig {
                    max_attempts: 64,
                    base_delay: Duration::from_millis(base_ms),
                    max_delay: Duration::from_secs(30),
                });
                prop_assert!(policy.delay_for(attempt) <= Duration::from_secs(30));
            }
        }
    }
}
