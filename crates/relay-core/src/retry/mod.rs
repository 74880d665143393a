//! Operation executor: bounded retries with backoff and jitter
//!
//! Every remote ledger call in the relay goes through a `RetryExecutor`.
//! Transient failures are absorbed here; only exhaustion and errors the
//! `RetryPredicate` rejects reach the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use relay_core::retry::{RetryExecutor, TracingObserver};
//! use relay_core::types::RetryPolicy;
//!
//! async fn example() {
//!     let executor = RetryExecutor::builder()
//!         .with_policy(RetryPolicy::default())
//!         .with_observer(TracingObserver::new("contest-count"))
//!         .build();
//!
//!     let count = executor
//!         .execute(|| async { Ok::<u64, std::io::Error>(3) })
//!         .await;
//! }
//! ```

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::{retry_with_policy, RetryExecutor, RetryExecutorBuilder};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use strategies::{calculate_delay, AlwaysRetry, ClosurePredicate, NeverRetry, RetryPredicate};
