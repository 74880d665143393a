//! Terminal results of a poll

/// Where a successful poll found its match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// One of the regular polling rounds
    Polling,
    /// The best-effort check after the last round
    FinalCheck,
}

/// Result of `ConditionPoller::poll_until`
///
/// Every variant is terminal. `rounds` counts the reads performed, the final
/// check included.
#[derive(Debug)]
pub enum PollOutcome<T, E> {
    /// The condition held for `value`
    Success { value: T, rounds: u32, phase: PollPhase },

    /// The condition never held within the attempt budget
    TimedOut {
        /// Last value read successfully, if any read succeeded
        last_observed: Option<T>,
        rounds: u32,
        /// Error of the last failed round, if any
        last_error: Option<E>,
    },

    /// A read failed with an error the predicate refused to retry
    Aborted { error: E, round: u32 },
}

impl<T, E> PollOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, PollOutcome::TimedOut { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, PollOutcome::Aborted { .. })
    }

    /// Number of reads performed
    pub fn rounds(&self) -> u32 {
        match self {
            PollOutcome::Success { rounds, .. } | PollOutcome::TimedOut { rounds, .. } => *rounds,
            PollOutcome::Aborted { round, .. } => *round,
        }
    }

    /// The matching value, if the poll succeeded
    pub fn into_value(self) -> Option<T> {
        match self {
            PollOutcome::Success { value, .. } => Some(value),
            _ => None,
        }
    }
}
