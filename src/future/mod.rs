//! Cancellable units of asynchronous work and the combinator racing them.
//!
//! A race is built from three pieces, each armed explicitly by the caller:
//!
//! - an [`Operation`], the fallible work being raced,
//! - a [`Timer`], the operation's own timeout,
//! - an optional [`AbortTrigger`], a supervisory deadline which cancels both.
//!
//! [`race`] runs the first two concurrently and resolves to a single
//! [`RaceResult`] naming the winner; [`Race::abort_on`] adds the trigger.
//!
//! # Examples
//!
//! ```
//! use race_cancel::prelude::*;
//! use race_cancel::{OperationError, TokioClock};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let clock = TokioClock::new();
//!
//! let lookup = async { Ok::<_, std::io::Error>("127.0.0.1") }.start();
//! let timer = Timer::after(&clock, Duration::from_millis(10));
//! let trigger = AbortTrigger::after(&clock, Duration::from_millis(2));
//!
//! match lookup.race_timer(timer).abort_on(trigger).await {
//!     RaceResult::OperationWon(Ok(addr)) => assert_eq!(addr, "127.0.0.1"),
//!     RaceResult::OperationWon(Err(OperationError::Failed(err))) => panic!("{err}"),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # }
//! ```
//!
//! # Tie-breaking
//!
//! | Ready in the same tick          | Winner                              |
//! | ---                             | ---                                 |
//! | operation and timer             | operation                           |
//! | timer and abort trigger         | timer, with `Elapsed`               |
//! | abort trigger only              | operation, with `Cancelled`         |
//! | operation, timer and trigger    | operation, with its own value       |
pub use abort::{AbortTrigger, Supervised};
pub use futures_ext::FutureExt;
pub use operation::{Operation, OperationState, OperationWatch};
pub use race::{race, Race, RaceResult};
pub use timer::{Timer, TimerState, TimerWatch};

mod abort;
mod futures_ext;
mod operation;
mod race;
mod timer;

use core::future::Future;

use crate::CancelToken;

/// A future which can be asked to stop early.
///
/// Implementors own a [`CancelToken`] and promise to resolve on the first
/// poll after that token is cancelled, unless they already completed. The
/// [`Race`] combinator relies on this to observe its loser's terminal state
/// right after cancelling it.
pub trait Cancellable: Future {
    /// The token through which this unit is cancelled.
    fn cancel_token(&self) -> &CancelToken;

    /// Request cancellation. Idempotent and never blocking.
    fn cancel(&self) {
        self.cancel_token().cancel();
    }
}
