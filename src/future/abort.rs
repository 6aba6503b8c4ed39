use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_core::future::FusedFuture;
use pin_project::pin_project;
use smallvec::SmallVec;

use super::race::{Race, RaceResult};
use super::Cancellable;
use crate::clock::Clock;
use crate::report::Reporter;
use crate::{CancelToken, Cancelled};

/// A supervisory deadline which cancels every unit it watches when it fires.
///
/// The trigger fires when its own deadline is reached, or as soon as its
/// [`signal`] is cancelled by some external event, whichever comes first. It
/// never reads the results of the units it watches; it only writes to their
/// cancellation tokens. A disabled trigger fires only through its signal, and
/// so does one whose deadline is too far away to be represented.
///
/// On its own the trigger resolves to `()` once fired. Registered on a race
/// through [`Race::abort_on`], it is driven alongside the race by
/// [`Supervised`].
///
/// [`signal`]: AbortTrigger::signal
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct AbortTrigger<S> {
    #[pin]
    sleep: Option<S>,
    deadline: Option<Instant>,
    due: bool,
    signal: CancelToken,
    signalled: Cancelled,
    targets: SmallVec<[CancelToken; 2]>,
    fired: bool,
}

impl<S: Future> AbortTrigger<S> {
    /// Arm a trigger which fires at `deadline`.
    pub fn arm<C>(clock: &C, deadline: Instant) -> Self
    where
        C: Clock<Sleep = S>,
    {
        let due = deadline <= clock.now();
        Self::new((!due).then(|| clock.sleep_until(deadline)), Some(deadline), due)
    }

    /// Arm a trigger which fires `duration` from the clock's current time.
    ///
    /// If that instant overflows, the trigger is [`disabled`].
    ///
    /// [`disabled`]: AbortTrigger::disabled
    pub fn after<C>(clock: &C, duration: Duration) -> Self
    where
        C: Clock<Sleep = S>,
    {
        match clock.now().checked_add(duration) {
            Some(deadline) => Self::arm(clock, deadline),
            None => Self::disabled(),
        }
    }

    /// Arm a trigger after `duration`, or a disabled one for `None`.
    pub fn configured<C>(clock: &C, duration: Option<Duration>) -> Self
    where
        C: Clock<Sleep = S>,
    {
        match duration {
            Some(duration) => Self::after(clock, duration),
            None => Self::disabled(),
        }
    }

    /// A trigger without a deadline.
    ///
    /// Nothing ties `S` to a clock here, so callers usually name it or use
    /// [`configured`][AbortTrigger::configured] with `None` instead.
    pub fn disabled() -> Self {
        Self::new(None, None, false)
    }

    /// Fire the trigger if its signal was set or its deadline was reached.
    ///
    /// Once fired this keeps returning `Poll::Ready(())`.
    pub fn poll_fire(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut this = self.project();
        if *this.fired {
            return Poll::Ready(());
        }

        let signalled = this.signalled.poll_cancelled(cx).is_ready();
        let expired = *this.due
            || match this.sleep.as_mut().as_pin_mut() {
                Some(sleep) => sleep.poll(cx).is_ready(),
                None => false,
            };
        if !signalled && !expired {
            return Poll::Pending;
        }

        *this.fired = true;
        this.sleep.set(None);
        this.signal.cancel();
        for target in this.targets.iter() {
            target.cancel();
        }
        tracing::debug!(
            targets = this.targets.len(),
            reason = if signalled { "signal" } else { "deadline" },
            "abort trigger fired"
        );
        Poll::Ready(())
    }
}

impl<S> AbortTrigger<S> {
    fn new(sleep: Option<S>, deadline: Option<Instant>, due: bool) -> Self {
        let signal = CancelToken::new();
        Self {
            sleep,
            deadline,
            due,
            signalled: signal.cancelled(),
            signal,
            targets: SmallVec::new(),
            fired: false,
        }
    }

    /// Cancel `token` when this trigger fires.
    ///
    /// A token registered after the trigger fired is cancelled immediately.
    pub fn watch(&mut self, token: CancelToken) {
        if self.fired {
            token.cancel();
        }
        self.targets.push(token);
    }

    /// The token which fires this trigger when cancelled.
    pub fn signal(&self) -> CancelToken {
        self.signal.clone()
    }

    /// The deadline, if the trigger is not disabled.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` once the trigger fired.
    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl<S> fmt::Debug for AbortTrigger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortTrigger")
            .field("deadline", &self.deadline)
            .field("targets", &self.targets.len())
            .field("fired", &self.fired)
            .finish()
    }
}

impl<S: Future> Future for AbortTrigger<S> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.poll_fire(cx)
    }
}

/// A [`Race`] driven together with an [`AbortTrigger`].
///
/// Everything runs inside this one future, so the race's winner decision and
/// the trigger's cancellations never interleave. The units are polled in
/// registration order: operation, timer, then the trigger. When the trigger
/// fires, the race is polled again within the same wake-up so that the
/// cancellation acknowledgement is reported without waiting for another
/// scheduling round. A trigger that is still pending when the race finishes
/// is dropped with it.
///
/// This `struct` is created by the [`abort_on`] method on [`Race`].
///
/// # Examples
///
/// ```
/// use race_cancel::future::{race, AbortTrigger, Operation, RaceResult, Timer};
/// use race_cancel::{OperationError, TokioClock};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let clock = TokioClock::new();
/// let lookup = Operation::start(std::future::pending::<Result<(), ()>>());
/// let timer = Timer::after(&clock, Duration::from_secs(10));
/// let trigger = AbortTrigger::after(&clock, Duration::from_millis(2));
///
/// let result = race(lookup, timer).abort_on(trigger).await;
/// assert_eq!(result, RaceResult::OperationWon(Err(OperationError::Cancelled)));
/// # }
/// ```
///
/// [`abort_on`]: Race::abort_on
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Supervised<A, B, S> {
    #[pin]
    race: Race<A, B>,
    #[pin]
    trigger: AbortTrigger<S>,
}

impl<A, B, S> Supervised<A, B, S>
where
    A: Cancellable,
    B: Cancellable,
    S: Future,
{
    pub(super) fn new(race: Race<A, B>, trigger: AbortTrigger<S>) -> Self {
        Self { race, trigger }
    }

    /// The token which fires the abort trigger when cancelled.
    pub fn abort_signal(&self) -> CancelToken {
        self.trigger.signal()
    }

    /// Await the race and hand its result to `reporter`.
    pub async fn report<R>(self, reporter: R) -> R::Output
    where
        R: Reporter<A::Output, B::Output>,
    {
        reporter.report(self.await)
    }
}

impl<A, B, S> fmt::Debug for Supervised<A, B, S>
where
    A: fmt::Debug,
    B: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervised")
            .field("race", &self.race)
            .field("trigger", &self.trigger)
            .finish()
    }
}

impl<A, B, S> Future for Supervised<A, B, S>
where
    A: Cancellable,
    B: Cancellable,
    S: Future,
{
    type Output = RaceResult<A::Output, B::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if let Poll::Ready(result) = this.race.as_mut().poll(cx) {
            return Poll::Ready(result);
        }
        if this.trigger.as_mut().poll_fire(cx).is_ready() {
            return this.race.as_mut().poll(cx);
        }
        Poll::Pending
    }
}

impl<A, B, S> FusedFuture for Supervised<A, B, S>
where
    A: Cancellable,
    B: Cancellable,
    S: Future,
{
    fn is_terminated(&self) -> bool {
        self.race.is_terminated()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::{OperationError, TimerOutcome};
    use crate::future::{race, Operation, OperationState, Timer, TimerState};
    use crate::utils::test_clock::FrozenClock;
    use futures_lite::future::block_on;
    use std::future;

    #[test]
    fn signal_fires_trigger_and_cancels_targets() {
        let clock = FrozenClock::new();
        let mut trigger = AbortTrigger::after(&clock, Duration::from_secs(5));
        let a = CancelToken::new();
        let b = CancelToken::new();
        trigger.watch(a.clone());
        trigger.watch(b.clone());

        trigger.signal().cancel();
        block_on(&mut trigger);
        assert!(trigger.has_fired());
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn due_trigger_fires_on_first_poll() {
        let clock = FrozenClock::new();
        let mut trigger = AbortTrigger::after(&clock, Duration::ZERO);
        let target = CancelToken::new();
        trigger.watch(target.clone());

        block_on(&mut trigger);
        assert!(target.is_cancelled());
    }

    #[test]
    fn late_registration_is_cancelled() {
        let clock = FrozenClock::new();
        let mut trigger = AbortTrigger::after(&clock, Duration::ZERO);
        block_on(&mut trigger);

        let target = CancelToken::new();
        trigger.watch(target.clone());
        assert!(target.is_cancelled());
    }

    #[test]
    fn disabled_trigger_leaves_race_alone() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::ready(Ok::<_, ()>(5)));
        let timer = Timer::after(&clock, Duration::from_secs(1));
        let trigger = AbortTrigger::configured(&clock, None);
        assert_eq!(trigger.deadline(), None);

        let result = block_on(race(op, timer).abort_on(trigger));
        assert_eq!(result, RaceResult::OperationWon(Ok(5)));
    }

    #[test]
    fn fired_trigger_cancels_both_units() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::pending::<Result<(), ()>>());
        let timer = Timer::after(&clock, Duration::from_secs(1));
        let (op_watch, timer_watch) = (op.watch(), timer.watch());
        let trigger = AbortTrigger::after(&clock, Duration::ZERO);

        let result = block_on(race(op, timer).abort_on(trigger));
        assert_eq!(result, RaceResult::OperationWon(Err(OperationError::Cancelled)));
        assert_eq!(op_watch.state(), OperationState::Cancelled);
        assert_eq!(timer_watch.state(), TimerState::Cancelled);
    }

    #[test]
    fn external_event_aborts_race() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::pending::<Result<(), ()>>());
        let timer = Timer::after(&clock, Duration::from_secs(1));
        let trigger = AbortTrigger::configured(&clock, None);
        let supervised = race(op, timer).abort_on(trigger);

        supervised.abort_signal().cancel();
        let result = block_on(supervised);
        assert!(result.is_operation_won());
        assert_eq!(result.status(), crate::RaceStatus::OperationCancelled);
    }

    #[test]
    fn natural_winner_beats_trigger_in_same_tick() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::pending::<Result<(), ()>>());
        let timer = Timer::after(&clock, Duration::ZERO);
        let trigger = AbortTrigger::after(&clock, Duration::ZERO);

        let result = block_on(race(op, timer).abort_on(trigger));
        assert_eq!(result, RaceResult::TimerWon(TimerOutcome::Elapsed));
    }

    #[test]
    fn poll_fire_waits_for_signal() {
        let clock = FrozenClock::new();
        let mut trigger = AbortTrigger::after(&clock, Duration::from_secs(5));
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut trigger).poll_fire(&mut cx).is_pending());
        assert!(!trigger.has_fired());

        trigger.signal().cancel();
        assert!(Pin::new(&mut trigger).poll_fire(&mut cx).is_ready());
        assert!(Pin::new(&mut trigger).poll_fire(&mut cx).is_ready());
        assert!(trigger.has_fired());
    }

    #[test]
    fn overflowing_deadline_disables_trigger() {
        let clock = FrozenClock::new();
        let op = Operation::start(future::ready(Ok::<_, ()>(1)));
        let timer = Timer::after(&clock, Duration::from_secs(1));
        let trigger = AbortTrigger::after(&clock, Duration::MAX);
        assert_eq!(trigger.deadline(), None);

        let result = block_on(race(op, timer).abort_on(trigger));
        assert_eq!(result, RaceResult::OperationWon(Ok(1)));
    }
}
