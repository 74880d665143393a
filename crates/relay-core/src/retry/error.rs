//! Error returned by the operation executor

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Why the executor gave up on an operation
///
/// Generic over `E`, the error type of the operation being retried.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed
    Exhausted {
        /// Number of invocations made
        attempts: u32,
        /// Error of the final invocation
        source: E,
        /// Time spent across all attempts, delays included
        total_duration: Duration,
    },

    /// The policy allowed no attempt at all
    Cancelled {
        /// Number of invocations made before stopping
        attempts: u32,
        /// Last error seen, if any
        last_error: Option<E>,
    },

    /// The retry predicate rejected the error; no further attempt was made
    NonRetryable {
        /// Invocation whose error was rejected
        attempt: u32,
        source: E,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => write!(
                f,
                "retries exhausted after {} attempts over {:.2}s: {}",
                attempts,
                total_duration.as_secs_f64(),
                source
            ),
            RetryError::Cancelled {
                attempts,
                last_error: Some(err),
            } => write!(f, "retry cancelled after {} attempts: {}", attempts, err),
            RetryError::Cancelled { attempts, .. } => {
                write!(f, "retry cancelled after {} attempts", attempts)
            }
            RetryError::NonRetryable { source, .. } => write!(f, "non-retryable error: {}", source),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source_ref().map(|e| e as &(dyn Error + 'static))
    }
}

impl<E> RetryError<E> {
    /// Create an exhausted error
    pub fn exhausted(attempts: u32, source: E, total_duration: Duration) -> Self {
        RetryError::Exhausted {
            attempts,
            source,
            total_duration,
        }
    }

    /// Create a cancelled error
    pub fn cancelled(attempts: u32, last_error: Option<E>) -> Self {
        RetryError::Cancelled {
            attempts,
            last_error,
        }
    }

    /// Create a non-retryable error rejected on invocation `attempt`
    pub fn non_retryable(attempt: u32, source: E) -> Self {
        RetryError::NonRetryable { attempt, source }
    }

    /// Number of invocations made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Cancelled { attempts, .. } => *attempts,
            RetryError::NonRetryable { attempt, .. } => *attempt,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    pub fn is_non_retryable(&self) -> bool {
        matches!(self, RetryError::NonRetryable { .. })
    }

    /// Consume the error and return the operation's error, if one was captured
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::Cancelled { last_error, .. } => last_error,
            RetryError::NonRetryable { source, .. } => Some(source),
        }
    }

    /// Borrow the operation's error, if one was captured
    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::Cancelled { last_error, .. } => last_error.as_ref(),
            RetryError::NonRetryable { source, .. } => Some(source),
        }
    }

    /// Map the operation's error type
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => RetryError::Exhausted {
                attempts,
                source: f(source),
                total_duration,
            },
            RetryError::Cancelled {
                attempts,
                last_error,
            } => RetryError::Cancelled {
                attempts,
                last_error: last_error.map(f),
            },
            RetryError::NonRetryable { attempt, source } => RetryError::NonRetryable {
                attempt,
                source: f(source),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_exhausted_error() {
        let err: RetryError<io::Error> = RetryError::exhausted(
            3,
            io::Error::new(io::ErrorKind::TimedOut, "timeout"),
            Duration::from_secs(5),
        );

        assert!(err.is_exhausted());
        assert!(!err.is_cancelled());
        assert!(!err.is_non_retryable());
        assert_eq!(err.attempts(), 3);
    }

    #[test]
    fn test_cancelled_without_error() {
        let err: RetryError<io::Error> = RetryError::cancelled(0, None);

        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 0);
        assert!(err.source_ref().is_none());
        assert_eq!(err.to_string(), "retry cancelled after 0 attempts");
    }

    #[test]
    fn test_non_retryable_keeps_rejected_attempt() {
        let err: RetryError<io::Error> =
            RetryError::non_retryable(2, io::Error::new(io::ErrorKind::InvalidInput, "bad address"));

        assert!(err.is_non_retryable());
        assert_eq!(err.attempts(), 2);
        assert!(err.to_string().contains("bad address"));
    }

    #[test]
    fn test_source_chain() {
        let err: RetryError<io::Error> = RetryError::exhausted(
            2,
            io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
            Duration::from_millis(10),
        );

        let source = Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "reset");
    }

    #[test]
    fn test_map_err() {
        let err: RetryError<i32> = RetryError::exhausted(3, 42, Duration::from_secs(1));

        let mapped = err.map_err(|n| format!("exit code {}", n));
        assert!(matches!(mapped, RetryError::Exhausted { source, .. } if source == "exit code 42"));
    }

    #[test]
    fn test_display_exhausted() {
        let err: RetryError<io::Error> = RetryError::exhausted(
            3,
            io::Error::new(io::ErrorKind::TimedOut, "connection timeout"),
            Duration::from_secs(5),
        );

        let display = err.to_string();
        assert!(display.contains("retries exhausted"));
        assert!(display.contains("3 attempts"));
        assert!(display.contains("connection timeout"));
    }
}
