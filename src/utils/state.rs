use std::sync::{Arc, Mutex};

use super::lock;

/// A lifecycle state which eventually reaches a terminal value.
pub(crate) trait Lifecycle: Copy {
    /// Returns `true` if no further transition may happen from this state.
    fn is_terminal(&self) -> bool;
}

/// Shared, observable lifecycle state of a unit of work.
///
/// The unit itself writes the state; any number of watchers read it. The
/// first terminal state written sticks, later writes are ignored.
#[derive(Debug)]
pub(crate) struct StateCell<S> {
    state: Arc<Mutex<S>>,
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Lifecycle> StateCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
        }
    }

    pub(crate) fn get(&self) -> S {
        *lock(&self.state)
    }

    /// Move into `next` unless a terminal state was already reached.
    ///
    /// Returns `true` if the transition happened.
    pub(crate) fn settle(&self, next: S) -> bool {
        let mut state = lock(&self.state);
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        On,
        Off,
        Broken,
    }

    impl Lifecycle for Light {
        fn is_terminal(&self) -> bool {
            matches!(self, Light::Broken)
        }
    }

    #[test]
    fn terminal_state_sticks() {
        let cell = StateCell::new(Light::Off);
        let watcher = cell.clone();

        assert!(cell.settle(Light::On));
        assert_eq!(watcher.get(), Light::On);

        assert!(cell.settle(Light::Broken));
        assert!(!cell.settle(Light::Off));
        assert_eq!(watcher.get(), Light::Broken);
    }
}
