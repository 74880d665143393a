//! Backoff strategies and retry predicates

use crate::types::{RetryPolicy, RetryStrategy};
use rand::Rng;
use std::time::Duration;

/// Calculate the delay before the next attempt
///
/// `attempt` is the 1-indexed number of the attempt that just failed. The
/// strategy's base delay is capped at `max_delay_ms` (no cap by default),
/// then up to `jitter_ms` of uniform random delay is added and the sum is
/// floored to whole milliseconds.
///
/// With the default policy (exponential, multiplier 1.5, 1000 ms, 500 ms jitter)
/// the delay after attempt `k + 1` lies in `[1000 * 1.5^k, 1000 * 1.5^k + 500)`.
///
/// # Example
///
/// ```rust
/// use relay_core::retry::calculate_delay;
/// use relay_core::types::RetryPolicy;
///
/// let policy = RetryPolicy::default();
///
/// assert_eq!(calculate_delay(&policy, 1, false).as_millis(), 1000);
/// assert_eq!(calculate_delay(&policy, 2, false).as_millis(), 1500);
/// assert_eq!(calculate_delay(&policy, 3, false).as_millis(), 2250);
/// ```
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32, jitter: bool) -> Duration {
    let attempt_index = attempt.saturating_sub(1);
    let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
    let initial = policy.initial_delay_ms as f64;

    let base_delay_ms = match policy.strategy {
        RetryStrategy::None => 0.0,
        RetryStrategy::FixedDelay => initial,
        RetryStrategy::ExponentialBackoff => {
            initial * policy.backoff_multiplier.powi(exponent)
        }
        RetryStrategy::LinearBackoff => initial * (attempt_index as f64 + 1.0),
    };

    let capped_delay_ms = base_delay_ms.min(policy.max_delay_ms as f64);

    let jitter_ms = if jitter && capped_delay_ms > 0.0 && policy.jitter_ms > 0 {
        rand::rng().random_range(0.0..policy.jitter_ms as f64)
    } else {
        0.0
    };

    Duration::from_millis((capped_delay_ms + jitter_ms).floor() as u64)
}

/// Decides whether an error is worth another attempt
///
/// Errors rejected by the predicate end the execution immediately with
/// `RetryError::NonRetryable`.
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    fn should_retry(&self, error: &E) -> bool;
}

/// Retries every error
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// Retries nothing
#[derive(Debug, Clone, Copy)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// Predicate backed by a closure
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

impl<E: ?Sized, P: RetryPredicate<E> + ?Sized> RetryPredicate<E> for &P {
    fn should_retry(&self, error: &E) -> bool {
        (**self).should_retry(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn policy(strategy: RetryStrategy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            strategy,
            backoff_multiplier: 2.0,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_ms: 500,
        }
    }

    #[test]
    fn test_none_strategy() {
        let policy = policy(RetryStrategy::None);

        assert_eq!(calculate_delay(&policy, 1, true), Duration::ZERO);
        assert_eq!(calculate_delay(&policy, 4, true), Duration::ZERO);
    }

    #[test]
    fn test_fixed_strategy() {
        let policy = policy(RetryStrategy::FixedDelay);

        for attempt in 1..=4 {
            assert_eq!(
                calculate_delay(&policy, attempt, false),
                Duration::from_millis(1000)
            );
        }
    }

    #[test]
    fn test_linear_strategy() {
        let policy = policy(RetryStrategy::LinearBackoff);

        assert_eq!(calculate_delay(&policy, 1, false), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&policy, 2, false), Duration::from_millis(2000));
        assert_eq!(calculate_delay(&policy, 3, false), Duration::from_millis(3000));
    }

    #[test]
    fn test_exponential_strategy_fractional_base_is_floored() {
        let policy = RetryPolicy::default();

        // 1000 * 1.5^4 = 5062.5
        assert_eq!(calculate_delay(&policy, 5, false), Duration::from_millis(5062));
    }

    #[test]
    fn test_huge_attempt_number_does_not_wrap() {
        let policy = RetryPolicy {
            jitter_ms: 0,
            ..RetryPolicy::default()
        };

        // a wrapped exponent would be negative and shrink the delay
        let delay = calculate_delay(&policy, u32::MAX, false);
        assert!(delay >= calculate_delay(&policy, 40, false));
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy {
            max_delay_ms: 5000,
            ..policy(RetryStrategy::ExponentialBackoff)
        };

        // 1000 * 2^4 = 16000, capped
        assert_eq!(calculate_delay(&policy, 5, false), Duration::from_millis(5000));
    }

    #[test]
    fn test_cap_applies_before_jitter() {
        let policy = RetryPolicy {
            max_delay_ms: 5000,
            ..policy(RetryStrategy::ExponentialBackoff)
        };

        for _ in 0..50 {
            let delay = calculate_delay(&policy, 8, true);
            assert!(delay >= Duration::from_millis(5000));
            assert!(delay < Duration::from_millis(5500));
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let policy = RetryPolicy {
            jitter_ms: 0,
            ..RetryPolicy::default()
        };

        assert_eq!(calculate_delay(&policy, 2, true), Duration::from_millis(1500));
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = ClosurePredicate::new(|err: &io::Error| {
            matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::ConnectionReset
            )
        });

        assert!(predicate.should_retry(&io::Error::new(io::ErrorKind::TimedOut, "t")));
        assert!(!predicate.should_retry(&io::Error::new(io::ErrorKind::InvalidInput, "i")));
    }

    #[test]
    fn test_fixed_predicates() {
        let error = io::Error::other("boom");
        assert!(AlwaysRetry.should_retry(&error));
        assert!(!NeverRetry.should_retry(&error));
    }
}
