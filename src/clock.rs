//! Time sources for timers and abort triggers.
//!
//! There is no process-wide timer in this crate. Every [`Timer`] and
//! [`AbortTrigger`] is armed against a clock handed in by the caller, which
//! keeps races independent of each other and lets tests substitute a paused
//! or simulated clock.
//!
//! [`Timer`]: crate::future::Timer
//! [`AbortTrigger`]: crate::future::AbortTrigger

use core::future::Future;
use std::time::Instant;

/// A source of the current time and of sleeps until a deadline.
pub trait Clock {
    /// The future returned by [`sleep_until`][Clock::sleep_until].
    type Sleep: Future;

    /// The current instant according to this clock.
    fn now(&self) -> Instant;

    /// Create a future which completes once `deadline` has been reached.
    fn sleep_until(&self, deadline: Instant) -> Self::Sleep;
}

/// A clock backed by the Tokio timer driver.
///
/// `now` follows Tokio's notion of time, so races armed with this clock obey
/// [`tokio::time::pause`] and `#[tokio::test(start_paused = true)]`. Sleeps
/// must be created from within a Tokio runtime with the time driver enabled.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[cfg(feature = "tokio")]
impl TokioClock {
    /// Create a new `TokioClock`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "tokio")]
impl Clock for TokioClock {
    type Sleep = tokio::time::Sleep;

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep_until(&self, deadline: Instant) -> Self::Sleep {
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline))
    }
}

/// A clock backed by [`async_io::Timer`] and the system monotonic clock.
#[cfg(feature = "async-io")]
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncIoClock;

#[cfg(feature = "async-io")]
impl AsyncIoClock {
    /// Create a new `AsyncIoClock`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "async-io")]
impl Clock for AsyncIoClock {
    type Sleep = async_io::Timer;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) -> Self::Sleep {
        async_io::Timer::at(deadline)
    }
}
