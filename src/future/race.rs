use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::future::FusedFuture;
use pin_project::pin_project;

use super::abort::{AbortTrigger, Supervised};
use super::Cancellable;
use crate::error::{OperationError, RaceError, RaceStatus, TimerOutcome};
use crate::report::Reporter;

/// The single outcome of a [`Race`].
///
/// Exactly one variant is produced per race. Each variant carries the
/// winner's own terminal value, whether that is a success, an error or an
/// acknowledged cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceResult<O, T> {
    /// The operation, registered first, reached a terminal state first.
    OperationWon(O),
    /// The timer, registered second, reached a terminal state first.
    TimerWon(T),
}

impl<O, T> RaceResult<O, T> {
    /// Returns `true` if the operation won.
    #[must_use]
    pub fn is_operation_won(&self) -> bool {
        matches!(self, RaceResult::OperationWon(_))
    }

    /// Returns `true` if the timer won.
    #[must_use]
    pub fn is_timer_won(&self) -> bool {
        matches!(self, RaceResult::TimerWon(_))
    }

    /// The operation's output, if it won.
    pub fn operation(self) -> Option<O> {
        match self {
            RaceResult::OperationWon(output) => Some(output),
            RaceResult::TimerWon(_) => None,
        }
    }

    /// The timer's output, if it won.
    pub fn timer(self) -> Option<T> {
        match self {
            RaceResult::OperationWon(_) => None,
            RaceResult::TimerWon(output) => Some(output),
        }
    }

    /// Borrow the winner's output.
    pub fn as_ref(&self) -> RaceResult<&O, &T> {
        match self {
            RaceResult::OperationWon(output) => RaceResult::OperationWon(output),
            RaceResult::TimerWon(output) => RaceResult::TimerWon(output),
        }
    }

    /// Map the operation's output, leaving a timer win untouched.
    pub fn map_operation<U, F>(self, f: F) -> RaceResult<U, T>
    where
        F: FnOnce(O) -> U,
    {
        match self {
            RaceResult::OperationWon(output) => RaceResult::OperationWon(f(output)),
            RaceResult::TimerWon(output) => RaceResult::TimerWon(output),
        }
    }
}

impl<V, E> RaceResult<Result<V, OperationError<E>>, TimerOutcome> {
    /// Classify how the race ended.
    pub fn status(&self) -> RaceStatus {
        match self {
            RaceResult::OperationWon(Ok(_)) => RaceStatus::OperationSucceeded,
            RaceResult::OperationWon(Err(OperationError::Failed(_))) => {
                RaceStatus::OperationFailed
            }
            RaceResult::OperationWon(Err(OperationError::Cancelled)) => {
                RaceStatus::OperationCancelled
            }
            RaceResult::TimerWon(TimerOutcome::Elapsed) => RaceStatus::TimerElapsed,
            RaceResult::TimerWon(TimerOutcome::Cancelled) => RaceStatus::TimerCancelled,
        }
    }

    /// Flatten into the operation's value or the reason there is none.
    pub fn into_result(self) -> Result<V, RaceError<E>> {
        match self {
            RaceResult::OperationWon(Ok(value)) => Ok(value),
            RaceResult::OperationWon(Err(OperationError::Failed(err))) => {
                Err(RaceError::OperationFailed(err))
            }
            RaceResult::OperationWon(Err(OperationError::Cancelled)) => {
                Err(RaceError::OperationCancelled)
            }
            RaceResult::TimerWon(TimerOutcome::Elapsed) => Err(RaceError::TimerElapsed),
            RaceResult::TimerWon(TimerOutcome::Cancelled) => {
                Err(RaceError::TimerCancelled)
            }
        }
    }
}

/// Wait for the first of two cancellable units to finish, cancelling the
/// other.
///
/// See [`Race`] for the exact semantics.
///
/// # Examples
///
/// ```
/// use race_cancel::future::{race, Operation, RaceResult, Timer};
/// use race_cancel::{TimerOutcome, TokioClock};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let clock = TokioClock::new();
/// let lookup = Operation::start(std::future::pending::<Result<(), ()>>());
/// let timer = Timer::after(&clock, Duration::from_millis(1));
///
/// let result = race(lookup, timer).await;
/// assert_eq!(result, RaceResult::TimerWon(TimerOutcome::Elapsed));
/// # }
/// ```
pub fn race<A, B>(operation: A, timer: B) -> Race<A, B>
where
    A: Cancellable,
    B: Cancellable,
{
    Race::new(operation, timer)
}

/// A future which races an operation against a timer.
///
/// Both units are polled on every wake-up, always in registration order:
/// the operation first, then the timer. The first unit found in a terminal
/// state is the winner, so when both become ready in the same tick the
/// operation wins. Once a winner is chosen the loser is cancelled and polled
/// one final time so its acknowledgement is observed before the result is
/// handed out. A loser which does not acknowledge on that poll reaches its
/// terminal state when the race is dropped.
///
/// Polling a `Race` after it produced its result is a bug and panics: a
/// second result for the same race would break the single-outcome invariant.
///
/// This `struct` is created by the [`race`] function, [`Race::new`] or the
/// [`race_timer`] method on [`FutureExt`].
///
/// [`race_timer`]: crate::future::FutureExt::race_timer
/// [`FutureExt`]: crate::future::FutureExt
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Race<A, B> {
    #[pin]
    operation: A,
    #[pin]
    timer: B,
    done: bool,
}

impl<A, B> Race<A, B>
where
    A: Cancellable,
    B: Cancellable,
{
    /// Create a race between `operation` and `timer`.
    pub fn new(operation: A, timer: B) -> Self {
        Self {
            operation,
            timer,
            done: false,
        }
    }

    /// Register an abort trigger which cancels both units when it fires.
    pub fn abort_on<S>(self, mut trigger: AbortTrigger<S>) -> Supervised<A, B, S>
    where
        S: Future,
    {
        trigger.watch(self.operation.cancel_token().clone());
        trigger.watch(self.timer.cancel_token().clone());
        Supervised::new(self, trigger)
    }

    /// Await the race and hand its result to `reporter`.
    pub async fn report<R>(self, reporter: R) -> R::Output
    where
        R: Reporter<A::Output, B::Output>,
    {
        reporter.report(self.await)
    }
}

impl<A, B> fmt::Debug for Race<A, B>
where
    A: fmt::Debug,
    B: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Race")
            .field("operation", &self.operation)
            .field("timer", &self.timer)
            .field("done", &self.done)
            .finish()
    }
}

impl<A, B> Future for Race<A, B>
where
    A: Cancellable,
    B: Cancellable,
{
    type Output = RaceResult<A::Output, B::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        assert!(!*this.done, "`Race` polled after producing its result");

        if let Poll::Ready(output) = this.operation.as_mut().poll(cx) {
            *this.done = true;
            tracing::debug!(winner = "operation", "race decided");
            settle_loser(this.timer.as_mut(), cx, "timer");
            return Poll::Ready(RaceResult::OperationWon(output));
        }

        if let Poll::Ready(output) = this.timer.as_mut().poll(cx) {
            *this.done = true;
            tracing::debug!(winner = "timer", "race decided");
            settle_loser(this.operation.as_mut(), cx, "operation");
            return Poll::Ready(RaceResult::TimerWon(output));
        }

        Poll::Pending
    }
}

impl<A, B> FusedFuture for Race<A, B>
where
    A: Cancellable,
    B: Cancellable,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}

/// Cancel the losing unit and poll it once to observe its acknowledgement.
///
/// The loser has not produced a terminal value yet, so this poll never
/// touches a completed future.
fn settle_loser<U>(loser: Pin<&mut U>, cx: &mut Context<'_>, name: &'static str)
where
    U: Cancellable,
{
    loser.cancel();
    match loser.poll(cx) {
        Poll::Ready(_) => tracing::trace!(loser = name, "loser acknowledged cancellation"),
        Poll::Pending => tracing::trace!(loser = name, "loser acknowledgement deferred"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::future::{Operation, OperationState, Timer, TimerState};
    use crate::utils::test_clock::FrozenClock;
    use futures_lite::future::block_on;
    use std::future;
    use std::pin::pin;
    use std::time::Duration;

    #[test]
    fn ready_operation_beats_pending_timer() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::ready(Ok::<_, ()>("v")));
        let timer = Timer::after(&clock, Duration::from_millis(10));
        let timer_watch = timer.watch();

        let result = block_on(race(op, timer));
        assert_eq!(result, RaceResult::OperationWon(Ok("v")));
        assert_eq!(timer_watch.state(), TimerState::Cancelled);
    }

    #[test]
    fn zero_timer_beats_stalled_operation() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::pending::<Result<(), ()>>());
        let op_watch = op.watch();
        let timer = Timer::after(&clock, Duration::ZERO);

        let result = block_on(race(op, timer));
        assert_eq!(result, RaceResult::TimerWon(TimerOutcome::Elapsed));
        assert_eq!(result.status(), RaceStatus::TimerElapsed);
        assert_eq!(op_watch.state(), OperationState::Cancelled);
    }

    #[test]
    fn registration_order_breaks_ties() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::ready(Ok::<_, ()>(1)));
        let timer = Timer::after(&clock, Duration::ZERO);
        let timer_watch = timer.watch();

        let result = block_on(race(op, timer));
        assert_eq!(result, RaceResult::OperationWon(Ok(1)));
        assert_eq!(timer_watch.state(), TimerState::Cancelled);
    }

    #[test]
    fn failed_operation_is_relayed_not_raised() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::ready(Err::<(), _>("refused")));
        let timer = Timer::after(&clock, Duration::from_secs(1));

        let result = block_on(race(op, timer));
        assert_eq!(result.status(), RaceStatus::OperationFailed);
        assert_eq!(
            result.into_result(),
            Err(RaceError::OperationFailed("refused"))
        );
    }

    #[test]
    fn cancelled_timer_wins_when_operation_stalls() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::pending::<Result<(), ()>>());
        let timer = Timer::after(&clock, Duration::from_secs(1));
        timer.cancel();

        let result = block_on(race(op, timer));
        assert_eq!(result, RaceResult::TimerWon(TimerOutcome::Cancelled));
        assert_eq!(result.into_result(), Err(RaceError::TimerCancelled));
    }

    #[test]
    fn both_pending_stays_pending() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::pending::<Result<(), ()>>());
        let timer = Timer::after(&clock, Duration::from_secs(1));
        let mut fut = pin!(race(op, timer));

        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert!(!fut.is_terminated());
    }

    #[test]
    #[should_panic(expected = "polled after producing its result")]
    fn second_result_is_a_bug() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::ready(Ok::<_, ()>(())));
        let timer = Timer::after(&clock, Duration::from_secs(1));
        let mut fut = pin!(race(op, timer));

        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(fut.as_mut().poll(&mut cx).is_ready());
        assert!(fut.is_terminated());
        let _ = fut.as_mut().poll(&mut cx);
    }

    #[test]
    fn result_accessors() {
        let won: RaceResult<u8, TimerOutcome> = RaceResult::OperationWon(3);
        assert!(won.is_operation_won());
        assert_eq!(won.map_operation(|v| v * 2).operation(), Some(6));
        assert_eq!(won.timer(), None);

        let lost: RaceResult<u8, TimerOutcome> =
            RaceResult::TimerWon(TimerOutcome::Elapsed);
        assert!(lost.is_timer_won());
        assert_eq!(lost.as_ref().timer(), Some(&TimerOutcome::Elapsed));
    }
}
