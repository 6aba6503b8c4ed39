use core::future::Future;

use super::{Cancellable, Operation, Race, Timer};

/// An extension trait for the `Future` trait.
pub trait FutureExt: Future {
    /// Turn a fallible future into a cancellable [`Operation`].
    fn start<T, E>(self) -> Operation<Self>
    where
        Self: Future<Output = Result<T, E>> + Sized,
    {
        Operation::start(self)
    }

    /// Race this future as an operation against `timer`.
    ///
    /// Plain fallible futures are wrapped with [`start`] first; pass an
    /// existing [`Operation`] through [`race`] to keep its watch handle.
    ///
    /// [`start`]: FutureExt::start
    /// [`race`]: crate::future::race
    fn race_timer<T, E, S>(self, timer: Timer<S>) -> Race<Operation<Self>, Timer<S>>
    where
        Self: Future<Output = Result<T, E>> + Sized,
        S: Future,
    {
        Race::new(Operation::start(self), timer)
    }
}

impl<F1> FutureExt for F1 where F1: Future {}

impl<F> Operation<F> {
    /// Race this operation against `timer`.
    pub fn race_timer<T, E, S>(self, timer: Timer<S>) -> Race<Self, Timer<S>>
    where
        F: Future<Output = Result<T, E>>,
        S: Future,
        Self: Cancellable,
    {
        Race::new(self, timer)
    }
}
