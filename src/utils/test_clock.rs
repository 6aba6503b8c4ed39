use core::future::{self, Pending};
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// A clock whose time never moves and whose sleeps never complete.
///
/// Deadlines at or before `now` are the only ones that can elapse, which is
/// what the unit tests need to drive timers without a runtime.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrozenClock {
    now: Instant,
}

impl FrozenClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Instant::now(),
        }
    }

    pub(crate) fn later(&self, duration: Duration) -> Instant {
        self.now + duration
    }
}

impl Clock for FrozenClock {
    type Sleep = Pending<()>;

    fn now(&self) -> Instant {
        self.now
    }

    fn sleep_until(&self, _deadline: Instant) -> Self::Sleep {
        future::pending()
    }
}
