//! Outcomes and errors of a race.
//!
//! Nothing in this module is ever returned as a failure of the race itself:
//! every variant travels as data inside a [`RaceResult`].
//!
//! [`RaceResult`]: crate::future::RaceResult

use core::fmt;

/// The terminal error of an [`Operation`][crate::future::Operation].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError<E> {
    /// The operation ran to completion and reported an error.
    #[error("operation failed: {0}")]
    Failed(#[source] E),
    /// The operation acknowledged a cancellation request before producing a
    /// value.
    #[error("operation cancelled")]
    Cancelled,
}

impl<E> OperationError<E> {
    /// Returns `true` if this is [`Cancelled`][OperationError::Cancelled].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled)
    }

    /// Returns the underlying failure, if any.
    pub fn into_failure(self) -> Option<E> {
        match self {
            OperationError::Failed(err) => Some(err),
            OperationError::Cancelled => None,
        }
    }
}

/// The terminal state of a [`Timer`][crate::future::Timer].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOutcome {
    /// The deadline was reached.
    Elapsed,
    /// The timer acknowledged a cancellation request before its deadline.
    Cancelled,
}

impl TimerOutcome {
    /// Returns `true` if the deadline was reached.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        matches!(self, TimerOutcome::Elapsed)
    }
}

impl fmt::Display for TimerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerOutcome::Elapsed => f.write_str("timer elapsed"),
            TimerOutcome::Cancelled => f.write_str("timer cancelled"),
        }
    }
}

/// Every way an operation-versus-timer race can end without a value.
///
/// Produced by [`RaceResult::into_result`] for callers who prefer `?` over
/// matching on the winner.
///
/// [`RaceResult::into_result`]: crate::future::RaceResult::into_result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaceError<E> {
    /// The operation won the race with an error of its own.
    #[error("operation failed: {0}")]
    OperationFailed(#[source] E),
    /// The operation won the race by acknowledging cancellation.
    #[error("operation cancelled")]
    OperationCancelled,
    /// The timer won the race by reaching its deadline.
    #[error("timer elapsed")]
    TimerElapsed,
    /// The timer won the race by acknowledging cancellation.
    #[error("timer cancelled")]
    TimerCancelled,
}

/// A payload-free summary of how a race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceStatus {
    /// The operation won with a value.
    OperationSucceeded,
    /// The operation won with an error.
    OperationFailed,
    /// The operation won by acknowledging cancellation.
    OperationCancelled,
    /// The timer won by reaching its deadline.
    TimerElapsed,
    /// The timer won by acknowledging cancellation.
    TimerCancelled,
}

impl RaceStatus {
    /// Returns `true` if the operation was the winner.
    #[must_use]
    pub fn operation_won(&self) -> bool {
        matches!(
            self,
            RaceStatus::OperationSucceeded
                | RaceStatus::OperationFailed
                | RaceStatus::OperationCancelled
        )
    }

    /// Returns `true` if the winner ended through cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RaceStatus::OperationCancelled | RaceStatus::TimerCancelled
        )
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RaceStatus::OperationSucceeded => "operation succeeded",
            RaceStatus::OperationFailed => "operation failed",
            RaceStatus::OperationCancelled => "operation cancelled",
            RaceStatus::TimerElapsed => "timer elapsed",
            RaceStatus::TimerCancelled => "timer cancelled",
        };
        f.write_str(label)
    }
}
