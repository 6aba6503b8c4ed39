//! Hand-off of a race's outcome to whatever renders it.
//!
//! A [`Reporter`] receives the [`RaceResult`] by value, so each race
//! reports at most once. Any `FnOnce(RaceResult<O, T>) -> R` closure is a
//! reporter; [`WriteReporter`] and [`TracingReporter`] render the outcome of
//! an operation-versus-timer race as text lines.

use core::fmt::Display;
use std::io::{self, Write};

use crate::error::{OperationError, RaceStatus, TimerOutcome};
use crate::future::RaceResult;

/// A consumer of a race's single outcome.
pub trait Reporter<O, T> {
    /// What reporting produces.
    type Output;

    /// Consume the outcome.
    fn report(self, result: RaceResult<O, T>) -> Self::Output;
}

impl<O, T, R, F> Reporter<O, T> for F
where
    F: FnOnce(RaceResult<O, T>) -> R,
{
    type Output = R;

    fn report(self, result: RaceResult<O, T>) -> R {
        self(result)
    }
}

/// A value which renders as one record per line.
pub trait Records {
    /// The lines describing this value.
    fn records(&self) -> Vec<String>;
}

impl Records for () {
    fn records(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Render an outcome as text lines.
///
/// The first line always names the winner and its own status; a successful
/// operation adds one line per record of its value.
pub fn render<V, E>(
    result: &RaceResult<Result<V, OperationError<E>>, TimerOutcome>,
) -> Vec<String>
where
    V: Records,
    E: Display,
{
    let status = result.status();
    match result {
        RaceResult::OperationWon(Ok(value)) => {
            let mut lines = vec![status.to_string()];
            lines.extend(value.records());
            lines
        }
        RaceResult::OperationWon(Err(OperationError::Failed(err))) => {
            vec![format!("{status}: {err}")]
        }
        RaceResult::OperationWon(Err(OperationError::Cancelled)) | RaceResult::TimerWon(_) => {
            vec![status.to_string()]
        }
    }
}

/// Writes the rendered outcome to an [`io::Write`] sink.
#[derive(Debug)]
pub struct WriteReporter<W> {
    writer: W,
}

impl<W: Write> WriteReporter<W> {
    /// Create a reporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<V, E, W> Reporter<Result<V, OperationError<E>>, TimerOutcome> for WriteReporter<W>
where
    V: Records,
    E: Display,
    W: Write,
{
    type Output = io::Result<W>;

    fn report(
        mut self,
        result: RaceResult<Result<V, OperationError<E>>, TimerOutcome>,
    ) -> Self::Output {
        for line in render(&result) {
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Emits the rendered outcome as `tracing` events.
///
/// Successful outcomes are logged at `INFO`, everything else at `WARN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl<V, E> Reporter<Result<V, OperationError<E>>, TimerOutcome> for TracingReporter
where
    V: Records,
    E: Display,
{
    type Output = RaceStatus;

    fn report(
        self,
        result: RaceResult<Result<V, OperationError<E>>, TimerOutcome>,
    ) -> RaceStatus {
        let status = result.status();
        for line in render(&result) {
            if status == RaceStatus::OperationSucceeded {
                tracing::info!(%status, "{line}");
            } else {
                tracing::warn!(%status, "{line}");
            }
        }
        status
    }
}
