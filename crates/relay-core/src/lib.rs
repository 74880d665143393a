//! # relay-core
//!
//! Core library for contest-relay providing:
//! - The operation executor (bounded retries with backoff and jitter)
//! - The condition poller (bounded polling until a predicate holds)
//! - Retry/poll policies and relay configuration types
//! - Configuration loading (relay.yaml + RELAY_* environment)

pub mod config;
pub mod error;
pub mod poll;
pub mod retry;
pub mod types;

pub use config::{ConfigLoader, LoadedConfig};
pub use error::{Error, Result};
pub use poll::{ConditionPoller, PollOutcome};
pub use retry::{RetryError, RetryExecutor};
