//! Cancellable, time-bounded races between an asynchronous operation and a
//! timer.
//!
//! A long-running request, such as a host name lookup, is raced against its
//! own timeout, while an independent abort trigger may cancel both before
//! either finishes. Whatever the ordering of these three events, the race
//! produces exactly one [`RaceResult`][future::RaceResult], and every unit
//! involved has reached a terminal state by the time it is reported.
//!
//! # Operations
//!
//! - [`future::Operation`]: a fallible future with its own [`CancelToken`].
//! - [`future::Timer`]: a cancellable delay armed against a [`Clock`].
//! - [`future::race`]: wait for the first of an operation and a timer.
//! - [`future::AbortTrigger`]: a supervisory deadline cancelling both.
//! - [`report::Reporter`]: hand the single outcome to a renderer.
//!
//! # Examples
//!
//! ```rust
//! use race_cancel::prelude::*;
//! use race_cancel::{OperationError, TokioClock};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let clock = TokioClock::new();
//!
//! let lookup = Operation::start(std::future::pending::<Result<(), ()>>());
//! let timer = Timer::after(&clock, Duration::from_millis(10));
//! let trigger = AbortTrigger::after(&clock, Duration::from_millis(2));
//!
//! let result = race(lookup, timer).abort_on(trigger).await;
//! assert_eq!(result, RaceResult::OperationWon(Err(OperationError::Cancelled)));
//! # }
//! ```
//!
//! # Scheduling
//!
//! A race and its abort trigger run inside a single future. Their state
//! transitions never interleave, whichever executor drives them and however
//! many threads that executor has. Cancellation only ever sets a flag and
//! wakes the affected task; it never blocks.

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod cancel;
mod utils;

pub mod clock;
pub mod config;
pub mod error;
pub mod future;
pub mod report;
pub mod resolve;

pub use cancel::{CancelToken, Cancelled};
#[cfg(feature = "async-io")]
pub use clock::AsyncIoClock;
pub use clock::Clock;
#[cfg(feature = "tokio")]
pub use clock::TokioClock;
pub use error::{OperationError, RaceError, RaceStatus, TimerOutcome};

/// The race-cancel prelude.
pub mod prelude {
    pub use super::clock::Clock;
    pub use super::future::FutureExt as _;
    pub use super::future::{
        race, AbortTrigger, Cancellable, Operation, Race, RaceResult, Timer,
    };
    pub use super::report::Reporter;
}
