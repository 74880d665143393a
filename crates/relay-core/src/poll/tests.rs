//! Behavioural tests for the condition poller
//!
//! All tests run on a paused clock; the default policy's multi-minute waits
//! are auto-advanced.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::poll::{poll_delay, ConditionPoller, PollOutcome, PollPhase};
use crate::retry::{ClosurePredicate, StatsObserver};
use crate::types::{PollPolicy, RetryPolicy, RetryStrategy};

fn transient() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")
}

fn instant_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        strategy: RetryStrategy::None,
        jitter_ms: 0,
        ..RetryPolicy::default()
    }
}

fn quick_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        initial_delay_ms: 10,
        backoff_multiplier: 2.0,
        max_delay_ms: 40,
        read_retry: instant_retry(3),
        final_check_retry: instant_retry(5),
    }
}

/// Read operation returning the number of times it has been called
fn counting_read(calls: &Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<u32, io::Error>> {
    let calls = calls.clone();
    move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
}

fn sum_of_waits(policy: &PollPolicy, rounds: u32) -> Duration {
    (0..rounds).map(|round| poll_delay(policy, round)).sum()
}

// ============================================================================
// Delay schedule
// ============================================================================

#[test]
fn poll_delay_grows_by_multiplier_until_cap() {
    let policy = PollPolicy::default();

    let expected = [
        30000, 39000, 50700, 65910, 85683, 111387, 144804, 188245, 244719, 300000, 300000,
    ];
    for (round, millis) in expected.iter().enumerate() {
        assert_eq!(
            poll_delay(&policy, round as u32),
            Duration::from_millis(*millis),
            "round {}",
            round
        );
    }
}

#[test]
fn poll_delay_honours_cap_for_large_rounds() {
    let policy = PollPolicy::default();

    for round in [20, 100, 1_000, u32::MAX] {
        assert_eq!(poll_delay(&policy, round), Duration::from_millis(300000));
    }
}

// ============================================================================
// Success paths
// ============================================================================

#[tokio::test(start_paused = true)]
async fn success_on_round_five_with_default_schedule() {
    let policy = PollPolicy::default();
    let calls = Arc::new(AtomicU32::new(0));
    let started = tokio::time::Instant::now();

    let outcome = ConditionPoller::new(policy.clone())
        .poll_until(counting_read(&calls), |count| *count >= 5)
        .await;

    match outcome {
        PollOutcome::Success {
            value,
            rounds,
            phase,
        } => {
            assert_eq!(value, 5);
            assert_eq!(rounds, 5);
            assert_eq!(phase, PollPhase::Polling);
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    // four waits (30s, 39s, 50.7s, 65.91s) and nothing after the match
    let elapsed = started.elapsed();
    let expected = sum_of_waits(&policy, 4);
    assert_eq!(expected, Duration::from_millis(185610));
    assert!(elapsed >= expected && elapsed < expected + Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn success_on_first_round_takes_no_time() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = tokio::time::Instant::now();

    let outcome = ConditionPoller::new(PollPolicy::default())
        .poll_until(counting_read(&calls), |_| true)
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.rounds(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn match_on_final_check_is_success() {
    let calls = Arc::new(AtomicU32::new(0));

    let outcome = ConditionPoller::new(quick_policy(4))
        .poll_until(counting_read(&calls), |count| *count == 5)
        .await;

    match outcome {
        PollOutcome::Success { value, rounds, phase } => {
            assert_eq!(value, 5);
            assert_eq!(rounds, 5);
            assert_eq!(phase, PollPhase::FinalCheck);
        }
        other => panic!("expected final-check success, got {:?}", other),
    }
}

// ============================================================================
// Timeout paths
// ============================================================================

#[tokio::test(start_paused = true)]
async fn never_matching_condition_reads_max_attempts_plus_final_check() {
    let policy = PollPolicy::default();
    let calls = Arc::new(AtomicU32::new(0));
    let started = tokio::time::Instant::now();

    let outcome = ConditionPoller::new(policy.clone())
        .poll_until(counting_read(&calls), |_| false)
        .await;

    match outcome {
        PollOutcome::TimedOut {
            last_observed,
            rounds,
            last_error,
        } => {
            assert_eq!(rounds, 13);
            assert_eq!(last_observed, Some(13));
            assert!(last_error.is_none());
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 13);

    // eleven waits between twelve rounds, none before the final check
    let elapsed = started.elapsed();
    let expected = sum_of_waits(&policy, 11);
    assert_eq!(expected, Duration::from_millis(1560448));
    assert!(elapsed >= expected && elapsed < expected + Duration::from_millis(20));
}

#[tokio::test(start_paused = true)]
async fn exhausted_reads_count_as_failed_rounds_not_aborts() {
    let observer = Arc::new(StatsObserver::new());
    let calls = AtomicU32::new(0);

    let outcome: PollOutcome<u32, io::Error> = ConditionPoller::new(quick_policy(3))
        .with_observer(observer.clone())
        .poll_until(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
            |_| true,
        )
        .await;

    match outcome {
        PollOutcome::TimedOut {
            last_observed,
            rounds,
            last_error,
        } => {
            assert_eq!(rounds, 4);
            assert!(last_observed.is_none());
            assert_eq!(last_error.unwrap().to_string(), "connection reset by peer");
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    // three rounds of 3 attempts, then the final check with 5
    assert_eq!(calls.load(Ordering::SeqCst), 3 * 3 + 5);
    assert_eq!(observer.exhaustions(), 4);
}

#[tokio::test(start_paused = true)]
async fn poller_recovers_after_transient_failures() {
    let calls = AtomicU32::new(0);

    let outcome = ConditionPoller::new(quick_policy(5))
        .poll_until(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    // the first round's three attempts all fail
                    if call <= 3 {
                        Err(transient())
                    } else {
                        Ok(call)
                    }
                }
            },
            |call| *call >= 4,
        )
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.rounds(), 2);
    assert_eq!(outcome.into_value(), Some(4));
}

// ============================================================================
// Fatal errors
// ============================================================================

#[tokio::test(start_paused = true)]
async fn non_retryable_error_aborts_the_poll() {
    let calls = AtomicU32::new(0);

    let outcome: PollOutcome<u32, io::Error> = ConditionPoller::new(quick_policy(6))
        .with_predicate(ClosurePredicate::new(|err: &io::Error| {
            err.kind() != io::ErrorKind::InvalidInput
        }))
        .poll_until(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(transient())
                    } else {
                        Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))
                    }
                }
            },
            |_| true,
        )
        .await;

    match outcome {
        PollOutcome::Aborted { error, round } => {
            assert_eq!(round, 1);
            assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
