//! Retry observation and logging
//!
//! `RetryObserver` receives a callback for every attempt the executor makes.
//! `TracingObserver` turns those callbacks into `tracing` events; observers
//! never influence control flow.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observer trait for retry attempt events
///
/// Attempt numbers are 1-indexed.
pub trait RetryObserver: Send + Sync {
    /// Called before each invocation of the operation
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32);

    /// Called when an attempt failed; the executor backs off for `delay`
    /// before the next attempt, or before giving up after the last one
    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration);

    /// Called when the operation succeeded
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when the final attempt failed
    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display);

    /// Called when the predicate rejected an error
    fn on_cancelled(&self, attempt: u32, error: Option<&dyn Display>) {
        let _ = (attempt, error);
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Display, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Display) {}
}

/// Observer that logs retry events through `tracing`
///
/// # Log Levels
///
/// - `on_attempt_start`: DEBUG
/// - `on_attempt_failed`: WARN
/// - `on_success`: INFO after a retry, DEBUG on the first attempt
/// - `on_exhausted`: ERROR
/// - `on_cancelled`: WARN
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    /// Create an observer; `operation` is attached to every event
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("ledger-call")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = max_attempts,
            "starting attempt"
        );
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, backing off"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            error = %final_error,
            "all retry attempts exhausted"
        );
    }

    fn on_cancelled(&self, attempt: u32, error: Option<&dyn Display>) {
        match error {
            Some(err) => tracing::warn!(
                operation = %self.operation,
                attempt = attempt,
                error = %err,
                "giving up on non-retryable error"
            ),
            None => tracing::warn!(
                operation = %self.operation,
                attempt = attempt,
                "retry cancelled"
            ),
        }
    }
}

/// Observer that counts events and records every backoff delay
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    failures: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
    cancellations: AtomicU32,
    delays: Mutex<Vec<Duration>>,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> u32 {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// Backoff delays in the order they were announced
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Display, delay: Duration) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(delay);
        }
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Display) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self, _attempt: u32, _error: Option<&dyn Display>) {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        (**self).on_attempt_failed(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {
        (**self).on_exhausted(attempts, final_error)
    }

    fn on_cancelled(&self, attempt: u32, error: Option<&dyn Display>) {
        (**self).on_cancelled(attempt, error)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for &T {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        (**self).on_attempt_failed(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {
        (**self).on_exhausted(attempts, final_error)
    }

    fn on_cancelled(&self, attempt: u32, error: Option<&dyn Display>) {
        (**self).on_cancelled(attempt, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_observer_records_delays() {
        let observer = StatsObserver::new();

        observer.on_attempt_start(1, 3);
        observer.on_attempt_failed(1, &"timeout", Duration::from_millis(1200));
        observer.on_attempt_start(2, 3);
        observer.on_attempt_failed(2, &"timeout", Duration::from_millis(1700));
        observer.on_attempt_start(3, 3);
        observer.on_exhausted(3, &"timeout");

        assert_eq!(observer.attempt_starts(), 3);
        assert_eq!(observer.failures(), 2);
        assert_eq!(observer.exhaustions(), 1);
        assert_eq!(
            observer.delays(),
            vec![Duration::from_millis(1200), Duration::from_millis(1700)]
        );
    }

    #[test]
    fn test_reference_and_arc_forward_events() {
        let observer = Arc::new(StatsObserver::new());
        let by_ref: &StatsObserver = &observer;

        by_ref.on_attempt_start(1, 1);
        observer.on_success(1, Duration::from_millis(3));
        observer.on_cancelled(1, None);

        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.cancellations(), 1);
    }

    #[test]
    fn test_tracing_observer_operation_name() {
        assert_eq!(TracingObserver::new("contest-count").operation(), "contest-count");
        assert_eq!(TracingObserver::default().operation(), "ledger-call");
    }
}
