//! Condition poller
//!
//! Drives repeated executor-wrapped reads until a predicate holds. Rounds are
//! separated by a capped power-law wait; a round whose read exhausts its
//! retries counts as "no match" and polling continues.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::retry::{
    AlwaysRetry, NoOpObserver, RetryError, RetryExecutor, RetryObserver, RetryPredicate,
};
use crate::types::{PollPolicy, RetryPolicy};

use super::outcome::{PollOutcome, PollPhase};

/// Wait after the unsuccessful round `round` (0-indexed)
///
/// `min(initial_delay_ms * multiplier^round, max_delay_ms)`, floored to whole
/// milliseconds.
///
/// ```rust
/// use relay_core::poll::poll_delay;
/// use relay_core::types::PollPolicy;
///
/// let policy = PollPolicy::default();
/// assert_eq!(poll_delay(&policy, 0).as_millis(), 30000);
/// assert_eq!(poll_delay(&policy, 1).as_millis(), 39000);
/// assert_eq!(poll_delay(&policy, 40).as_millis(), 300000);
/// ```
pub fn poll_delay(policy: &PollPolicy, round: u32) -> Duration {
    let exponent = round.min(i32::MAX as u32) as i32;
    let delay_ms = policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let capped_ms = delay_ms.min(policy.max_delay_ms as f64);
    Duration::from_millis(capped_ms.floor() as u64)
}

/// Polls a read operation until a condition holds
///
/// ```rust,no_run
/// use relay_core::poll::ConditionPoller;
/// use relay_core::types::PollPolicy;
///
/// async fn example() {
///     let outcome = ConditionPoller::new(PollPolicy::default())
///         .with_label("contest-creation")
///         .poll_until(
///             || async { Ok::<u64, std::io::Error>(4) },
///             |count| *count > 3,
///         )
///         .await;
///     assert!(outcome.is_success());
/// }
/// ```
pub struct ConditionPoller<P = AlwaysRetry, O = NoOpObserver> {
    policy: PollPolicy,
    predicate: P,
    observer: O,
    jitter: bool,
    label: String,
}

impl ConditionPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            predicate: AlwaysRetry,
            observer: NoOpObserver,
            jitter: true,
            label: "poll".to_string(),
        }
    }
}

impl<P, O> ConditionPoller<P, O> {
    /// Predicate deciding which read errors the inner executor retries
    pub fn with_predicate<P2>(self, predicate: P2) -> ConditionPoller<P2, O> {
        ConditionPoller {
            policy: self.policy,
            predicate,
            observer: self.observer,
            jitter: self.jitter,
            label: self.label,
        }
    }

    /// Observer for the attempts of the inner executor
    pub fn with_observer<O2>(self, observer: O2) -> ConditionPoller<P, O2> {
        ConditionPoller {
            policy: self.policy,
            predicate: self.predicate,
            observer,
            jitter: self.jitter,
            label: self.label,
        }
    }

    /// Jitter of the inner executor's retry delays; round waits never jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Name attached to log events
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }
}

impl<P, O> ConditionPoller<P, O>
where
    O: RetryObserver,
{
    /// Poll `read_op` until `condition` holds for its result
    ///
    /// Runs up to `policy.max_attempts` rounds, each an executor call with the
    /// `read_retry` budget, then one final check with the `final_check_retry`
    /// budget. Returns on the first match without waiting.
    pub async fn poll_until<F, Fut, T, E, C>(&self, mut read_op: F, condition: C) -> PollOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: Fn(&T) -> bool,
        P: RetryPredicate<E>,
    {
        let max_rounds = self.policy.max_attempts;
        let mut last_observed: Option<T> = None;
        let mut last_error: Option<E> = None;

        for round in 0..max_rounds {
            tracing::info!(
                label = %self.label,
                round = round + 1,
                max_rounds = max_rounds,
                "checking condition"
            );

            match self.read(&self.policy.read_retry, &mut read_op).await {
                Ok(value) if condition(&value) => {
                    tracing::info!(label = %self.label, round = round + 1, "condition met");
                    return PollOutcome::Success {
                        value,
                        rounds: round + 1,
                        phase: PollPhase::Polling,
                    };
                }
                Ok(value) => {
                    tracing::debug!(label = %self.label, round = round + 1, "condition not met yet");
                    last_observed = Some(value);
                }
                Err(RetryError::NonRetryable { source: error, .. }) => {
                    tracing::error!(label = %self.label, error = %error, "read failed permanently");
                    return PollOutcome::Aborted {
                        error,
                        round: round + 1,
                    };
                }
                Err(err) => {
                    tracing::warn!(label = %self.label, error = %err, "read failed this round");
                    last_error = err.into_source();
                }
            }

            if round + 1 < max_rounds {
                let wait = poll_delay(&self.policy, round);
                tracing::info!(
                    label = %self.label,
                    wait_secs = wait.as_secs(),
                    "waiting before next check"
                );
                tokio::time::sleep(wait).await;
            }
        }

        let final_round = max_rounds + 1;
        tracing::info!(label = %self.label, "performing final verification check");

        match self.read(&self.policy.final_check_retry, &mut read_op).await {
            Ok(value) if condition(&value) => {
                tracing::info!(label = %self.label, "condition met on final check");
                return PollOutcome::Success {
                    value,
                    rounds: final_round,
                    phase: PollPhase::FinalCheck,
                };
            }
            Ok(value) => last_observed = Some(value),
            Err(RetryError::NonRetryable { source: error, .. }) => {
                tracing::error!(label = %self.label, error = %error, "final check failed permanently");
                return PollOutcome::Aborted {
                    error,
                    round: final_round,
                };
            }
            Err(err) => {
                tracing::warn!(label = %self.label, error = %err, "final verification failed");
                last_error = err.into_source();
            }
        }

        tracing::warn!(label = %self.label, rounds = final_round, "condition not met, giving up");
        PollOutcome::TimedOut {
            last_observed,
            rounds: final_round,
            last_error,
        }
    }

    async fn read<F, Fut, T, E>(
        &self,
        policy: &RetryPolicy,
        read_op: &mut F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: RetryPredicate<E>,
    {
        RetryExecutor::builder()
            .with_policy(policy.clone())
            .with_predicate(&self.predicate)
            .with_observer(&self.observer)
            .with_jitter(self.jitter)
            .build()
            .execute(read_op)
            .await
    }
}
