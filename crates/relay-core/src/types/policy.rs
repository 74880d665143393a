//! Retry and poll policy types

use serde::{Deserialize, Serialize};

/// Retry policy for a single remote operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of invocations of the operation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds, applied before jitter (unbounded by default)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Upper bound (exclusive) of the random delay added to each backoff
    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            jitter_ms: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// The default policy with a different attempt budget
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    1.5
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    u64::MAX
}
fn default_jitter() -> u64 {
    500
}

/// Retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Retry immediately
    None,

    /// Fixed delay between retries
    FixedDelay,

    /// Exponential backoff (default)
    #[default]
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

/// Policy for polling the ledger until a condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollPolicy {
    /// Number of polling rounds before the final check
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,

    /// Wait after the first unsuccessful round, in milliseconds
    #[serde(default = "default_poll_initial_delay")]
    pub initial_delay_ms: u64,

    /// Growth factor of the wait between rounds
    #[serde(default = "default_poll_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound of the wait between rounds, in milliseconds
    #[serde(default = "default_poll_max_delay")]
    pub max_delay_ms: u64,

    /// Retry budget for the read performed in each round
    #[serde(default)]
    pub read_retry: RetryPolicy,

    /// Retry budget for the final best-effort check
    #[serde(default = "default_final_check_retry")]
    pub final_check_retry: RetryPolicy,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_poll_attempts(),
            initial_delay_ms: default_poll_initial_delay(),
            backoff_multiplier: default_poll_multiplier(),
            max_delay_ms: default_poll_max_delay(),
            read_retry: RetryPolicy::default(),
            final_check_retry: default_final_check_retry(),
        }
    }
}

fn default_poll_attempts() -> u32 {
    12
}
fn default_poll_initial_delay() -> u64 {
    30000
}
fn default_poll_multiplier() -> f64 {
    1.3
}
fn default_poll_max_delay() -> u64 {
    300000
}
fn default_final_check_retry() -> RetryPolicy {
    RetryPolicy::with_max_attempts(5)
}
