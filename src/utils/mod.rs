//! Utilities to implement the different futures of this crate.

mod state;

#[cfg(test)]
pub(crate) mod test_clock;

pub(crate) use state::{Lifecycle, StateCell};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every mutex in this crate guards plain data whose invariants hold between
/// statements, so a poisoned lock carries no torn state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
