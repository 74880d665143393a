//! Operation executor
//!
//! Runs a fallible async operation until it succeeds, the policy's attempt
//! budget is spent, or the predicate rejects an error.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use crate::types::RetryPolicy;

use super::error::RetryError;
use super::observer::{NoOpObserver, RetryObserver};
use super::strategies::{calculate_delay, AlwaysRetry, RetryPredicate};

/// Execute an operation with the given policy, retrying every error
///
/// # Example
///
/// ```rust,no_run
/// use relay_core::retry::retry_with_policy;
/// use relay_core::types::RetryPolicy;
///
/// async fn example() {
///     let count = retry_with_policy(&RetryPolicy::default(), || async {
///         Ok::<_, std::io::Error>(7u64)
///     })
///     .await;
/// }
/// ```
pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryExecutor::builder()
        .with_policy(policy.clone())
        .build()
        .execute(op)
        .await
}

/// Builder for a `RetryExecutor`
///
/// ```rust
/// use relay_core::retry::{RetryExecutor, TracingObserver};
/// use relay_core::types::RetryPolicy;
///
/// let executor = RetryExecutor::builder()
///     .with_policy(RetryPolicy::with_max_attempts(5))
///     .with_observer(TracingObserver::new("contest-count"))
///     .build();
/// ```
pub struct RetryExecutorBuilder<P = AlwaysRetry, O = NoOpObserver> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    jitter: bool,
}

impl Default for RetryExecutorBuilder<AlwaysRetry, NoOpObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutorBuilder<AlwaysRetry, NoOpObserver> {
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            predicate: AlwaysRetry,
            observer: NoOpObserver,
            jitter: true,
        }
    }
}

impl<P, O> RetryExecutorBuilder<P, O> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the predicate deciding which errors are retried
    pub fn with_predicate<P2>(self, predicate: P2) -> RetryExecutorBuilder<P2, O> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate,
            observer: self.observer,
            jitter: self.jitter,
        }
    }

    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<P, O2> {
        RetryExecutorBuilder {
            policy: self.policy,
            predicate: self.predicate,
            observer,
            jitter: self.jitter,
        }
    }

    /// Enable or disable the random part of the delay (enabled by default)
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn build(self) -> RetryExecutor<P, O> {
        RetryExecutor {
            policy: self.policy,
            predicate: self.predicate,
            observer: self.observer,
            jitter: self.jitter,
        }
    }
}

/// Retry executor with a policy, predicate and observer
pub struct RetryExecutor<P = AlwaysRetry, O = NoOpObserver> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    jitter: bool,
}

impl RetryExecutor {
    pub fn builder() -> RetryExecutorBuilder {
        RetryExecutorBuilder::new()
    }
}

impl<P, O> RetryExecutor<P, O> {
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<P, O> RetryExecutor<P, O>
where
    O: RetryObserver,
{
    /// Run `op` until it succeeds or the attempt budget is spent
    ///
    /// The operation is invoked at most `policy.max_attempts` times. Every
    /// retryable failure is followed by a `calculate_delay` back-off, the
    /// final one included, so an exhausted call returns only after its last
    /// delay has elapsed.
    pub async fn execute<F, Fut, T, E>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: RetryPredicate<E>,
    {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            self.observer.on_attempt_start(attempt, max_attempts);

            let err = match op().await {
                Ok(value) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !self.predicate.should_retry(&err) {
                self.observer.on_cancelled(attempt, Some(&err));
                return Err(RetryError::non_retryable(attempt, err));
            }

            let delay = calculate_delay(&self.policy, attempt, self.jitter);
            self.observer.on_attempt_failed(attempt, &err, delay);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if attempt == max_attempts {
                self.observer.on_exhausted(attempt, &err);
                return Err(RetryError::exhausted(attempt, err, start.elapsed()));
            }
        }

        // Only reachable with a zero attempt budget
        self.observer.on_cancelled(0, None);
        Err(RetryError::cancelled(0, None))
    }
}
