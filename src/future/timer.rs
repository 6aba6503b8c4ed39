use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{ready, Context, Poll};
use std::time::{Duration, Instant};

use pin_project::{pin_project, pinned_drop};

use super::Cancellable;
use crate::clock::Clock;
use crate::error::TimerOutcome;
use crate::utils::{Lifecycle, StateCell};
use crate::{CancelToken, Cancelled};

/// The lifecycle of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerState {
    /// Waiting for the deadline.
    Armed,
    /// The deadline was reached.
    Elapsed,
    /// Acknowledged a cancellation request, or was dropped while armed.
    Cancelled,
}

impl TimerState {
    /// Returns `true` if no further transition may happen from this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TimerState::Armed)
    }
}

impl Lifecycle for TimerState {
    fn is_terminal(&self) -> bool {
        TimerState::is_terminal(self)
    }
}

/// A cancellable delay.
///
/// Resolves to [`TimerOutcome::Elapsed`] once its deadline is reached, or to
/// [`TimerOutcome::Cancelled`] on the first poll after cancellation was
/// requested. Cancellation is checked before the deadline, so a timer that
/// is both cancelled and due reports `Cancelled`.
///
/// A deadline at or before the clock's current time elapses on the first
/// poll without creating a sleep. A duration too large to be represented as
/// an [`Instant`] yields a timer that never elapses and only resolves
/// through cancellation.
///
/// # Examples
///
/// ```
/// use race_cancel::future::Timer;
/// use race_cancel::{TimerOutcome, TokioClock};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let timer = Timer::after(&TokioClock::new(), Duration::ZERO);
/// assert_eq!(timer.await, TimerOutcome::Elapsed);
/// # }
/// ```
#[pin_project(PinnedDrop)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Timer<S> {
    #[pin]
    sleep: Option<S>,
    deadline: Option<Instant>,
    token: CancelToken,
    cancelled: Cancelled,
    state: StateCell<TimerState>,
}

impl<S: Future> Timer<S> {
    /// Arm a timer which elapses at `deadline`.
    pub fn arm<C>(clock: &C, deadline: Instant) -> Self
    where
        C: Clock<Sleep = S>,
    {
        let sleep = (deadline > clock.now()).then(|| clock.sleep_until(deadline));
        Self::new(sleep, Some(deadline))
    }

    /// Arm a timer which elapses `duration` from the clock's current time.
    ///
    /// If that instant overflows, the timer never elapses.
    pub fn after<C>(clock: &C, duration: Duration) -> Self
    where
        C: Clock<Sleep = S>,
    {
        match clock.now().checked_add(duration) {
            Some(deadline) => Self::arm(clock, deadline),
            None => Self::never(),
        }
    }

    /// A timer which never elapses and only resolves once cancelled.
    pub fn never() -> Self {
        Self::new(None, None)
    }
}

impl<S> Timer<S> {
    fn new(sleep: Option<S>, deadline: Option<Instant>) -> Self {
        let token = CancelToken::new();
        Self {
            sleep,
            deadline,
            cancelled: token.cancelled(),
            token,
            state: StateCell::new(TimerState::Armed),
        }
    }

    /// The instant this timer elapses at, or `None` if it never does.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Request cancellation. Safe to call repeatedly and after completion.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The current lifecycle state.
    pub fn state(&self) -> TimerState {
        self.state.get()
    }

    /// A handle observing this timer after it has been moved into a race.
    pub fn watch(&self) -> TimerWatch {
        TimerWatch {
            token: self.token.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S> fmt::Debug for Timer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("deadline", &self.deadline)
            .field("state", &self.state.get())
            .finish()
    }
}

impl<S: Future> Future for Timer<S> {
    type Output = TimerOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        assert!(
            !this.state.get().is_terminal(),
            "`Timer` polled after completing"
        );

        if this.cancelled.poll_cancelled(cx).is_ready() {
            this.sleep.set(None);
            this.state.settle(TimerState::Cancelled);
            tracing::trace!("timer acknowledged cancellation");
            return Poll::Ready(TimerOutcome::Cancelled);
        }

        match this.sleep.as_mut().as_pin_mut() {
            Some(sleep) => {
                ready!(sleep.poll(cx));
                this.sleep.set(None);
            }
            None if this.deadline.is_none() => return Poll::Pending,
            None => {}
        }
        this.state.settle(TimerState::Elapsed);
        Poll::Ready(TimerOutcome::Elapsed)
    }
}

impl<S: Future> Cancellable for Timer<S> {
    fn cancel_token(&self) -> &CancelToken {
        &self.token
    }
}

#[pinned_drop]
impl<S> PinnedDrop for Timer<S> {
    fn drop(self: Pin<&mut Self>) {
        self.state.settle(TimerState::Cancelled);
    }
}

/// An observer of a [`Timer`]'s lifecycle.
#[derive(Debug, Clone)]
pub struct TimerWatch {
    token: CancelToken,
    state: StateCell<TimerState>,
}

impl TimerWatch {
    /// The current lifecycle state.
    pub fn state(&self) -> TimerState {
        self.state.get()
    }

    /// Returns `true` once the timer reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cancellation of the observed timer.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}
