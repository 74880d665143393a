//! Condition poller: bounded polling of an eventually-consistent ledger
//!
//! State machine: `Polling -> Success`, `Polling -> FinalCheck -> Success`,
//! `Polling -> FinalCheck -> TimedOut`, or `Aborted` when a read fails with an
//! error the retry predicate refuses.

mod outcome;
mod poller;

pub use outcome::{PollOutcome, PollPhase};
pub use poller::{poll_delay, ConditionPoller};

#[cfg(test)]
mod tests;
