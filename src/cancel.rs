//! One-shot cancellation signals.
//!
//! A [`CancelToken`] is the channel through which a unit of work is asked to
//! stop. Every racing unit owns one; the race and the abort trigger hold
//! clones and only ever write to them. The flag and its wake-ups are
//! provided by [`tokio_util::sync::CancellationToken`], which needs no
//! runtime and works with any executor.

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// A cheaply cloneable, one-shot cancellation flag.
///
/// The flag starts unset. Once set it stays set for the lifetime of every
/// clone, and setting it again is a no-op.
///
/// # Examples
///
/// ```
/// use race_cancel::CancelToken;
///
/// let token = CancelToken::new();
/// let observer = token.clone();
///
/// token.cancel();
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    /// Create a new, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every task waiting on this token.
    ///
    /// Never blocks on the cancelled work.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns `true` if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Wait until cancellation is requested.
    ///
    /// The returned future holds its own clone of the token, so it can be
    /// stored next to the token inside another future.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            wait: Box::pin(self.inner.clone().cancelled_owned()),
        }
    }
}

impl From<CancellationToken> for CancelToken {
    fn from(inner: CancellationToken) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A future which resolves once a [`CancelToken`] is cancelled.
///
/// The wait is boxed so `Cancelled` is `Unpin` and can be polled in place
/// from any other future's `poll`.
///
/// This `struct` is created by the [`cancelled`] method on [`CancelToken`].
///
/// [`cancelled`]: CancelToken::cancelled
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Cancelled {
    wait: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl Cancelled {
    /// Poll for cancellation, registering the current task to be woken once
    /// the token is cancelled.
    pub fn poll_cancelled(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.wait.as_mut().poll(cx)
    }
}

impl fmt::Debug for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancelled").finish_non_exhaustive()
    }
}

impl Future for Cancelled {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.poll_cancelled(cx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_lite::future::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Wake, Waker};

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        let unrelated = CancelToken::new();

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(!unrelated.is_cancelled());
    }

    #[test]
    fn cancel_wakes_registered_task_once() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker: Waker = counter.clone().into();
        let mut cx = Context::from_waker(&waker);

        let token = CancelToken::new();
        let mut cancelled = token.cancelled();
        assert!(cancelled.poll_cancelled(&mut cx).is_pending());
        assert!(cancelled.poll_cancelled(&mut cx).is_pending());

        token.cancel();
        token.cancel();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(cancelled.poll_cancelled(&mut cx).is_ready());
    }

    #[test]
    fn wait_created_after_cancel_is_ready() {
        let token = CancelToken::new();
        token.cancel();
        block_on(token.cancelled());
    }

    #[test]
    fn cancelled_future_resolves() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = std::thread::spawn(move || {
            remote.cancel();
        });
        block_on(token.cancelled());
        handle.join().unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn wraps_an_existing_shutdown_token() {
        let shutdown = CancellationToken::new();
        let token = CancelToken::from(shutdown.child_token());

        shutdown.cancel();
        assert!(token.is_cancelled());
    }
}
