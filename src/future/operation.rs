use core::fmt;
use core::future::{Future, IntoFuture};
use core::pin::Pin;
use core::task::{ready, Context, Poll};

use pin_project::{pin_project, pinned_drop};

use super::Cancellable;
use crate::error::OperationError;
use crate::utils::{Lifecycle, StateCell};
use crate::{CancelToken, Cancelled};

/// The lifecycle of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// Not yet finished.
    Pending,
    /// Finished with a value.
    Completed,
    /// Finished with an error.
    Failed,
    /// Acknowledged a cancellation request, or was dropped while pending.
    Cancelled,
}

impl OperationState {
    /// Returns `true` if no further transition may happen from this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::Pending)
    }
}

impl Lifecycle for OperationState {
    fn is_terminal(&self) -> bool {
        OperationState::is_terminal(self)
    }
}

/// A cancellable unit of asynchronous work.
///
/// Wraps a fallible future together with its own [`CancelToken`]. The work
/// itself runs when the operation is polled, typically by a [`Race`].
/// Cancellation is a request: the operation acknowledges it on its next poll
/// by dropping the wrapped future and resolving to
/// [`OperationError::Cancelled`]. I/O the wrapped future had already handed
/// off elsewhere may keep running, but its result is never delivered.
///
/// This `struct` is created by [`Operation::start`] or the [`start`] method
/// on [`FutureExt`].
///
/// # Examples
///
/// ```
/// use race_cancel::future::{Operation, OperationState};
/// use race_cancel::OperationError;
/// use futures_lite::future::block_on;
///
/// let op = Operation::start(async { Ok::<_, ()>(12) });
/// let watch = op.watch();
/// op.cancel();
///
/// assert_eq!(block_on(op), Err(OperationError::Cancelled));
/// assert_eq!(watch.state(), OperationState::Cancelled);
/// ```
///
/// [`Race`]: crate::future::Race
/// [`start`]: crate::future::FutureExt::start
/// [`FutureExt`]: crate::future::FutureExt
#[pin_project(PinnedDrop)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Operation<F> {
    #[pin]
    future: Option<F>,
    token: CancelToken,
    cancelled: Cancelled,
    state: StateCell<OperationState>,
}

impl<F> Operation<F> {
    /// Begin a new operation from a fallible future.
    pub fn start<I>(future: I) -> Self
    where
        I: IntoFuture<IntoFuture = F>,
    {
        Self::with_token(future, CancelToken::new())
    }

    /// Begin a new operation which is cancelled through `token`.
    ///
    /// Useful when the caller already owns a token tied to a wider scope.
    pub fn with_token<I>(future: I, token: CancelToken) -> Self
    where
        I: IntoFuture<IntoFuture = F>,
    {
        Self {
            future: Some(future.into_future()),
            cancelled: token.cancelled(),
            token,
            state: StateCell::new(OperationState::Pending),
        }
    }

    /// Request cancellation. Safe to call repeatedly and after completion.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The current lifecycle state.
    pub fn state(&self) -> OperationState {
        self.state.get()
    }

    /// A handle observing this operation after it has been moved into a race.
    pub fn watch(&self) -> OperationWatch {
        OperationWatch {
            token: self.token.clone(),
            state: self.state.clone(),
        }
    }
}

impl<F> fmt::Debug for Operation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("state", &self.state.get())
            .field("token", &self.token)
            .finish()
    }
}

impl<F, T, E> Future for Operation<F>
where
    F: Future<Output = Result<T, E>>,
{
    type Output = Result<T, OperationError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if this.cancelled.poll_cancelled(cx).is_ready() {
            assert!(
                this.future.is_some(),
                "`Operation` polled after completing"
            );
            this.future.set(None);
            this.state.settle(OperationState::Cancelled);
            tracing::trace!("operation acknowledged cancellation");
            return Poll::Ready(Err(OperationError::Cancelled));
        }

        let Some(future) = this.future.as_mut().as_pin_mut() else {
            panic!("`Operation` polled after completing");
        };
        let output = ready!(future.poll(cx));
        this.future.set(None);

        Poll::Ready(match output {
            Ok(value) => {
                this.state.settle(OperationState::Completed);
                Ok(value)
            }
            Err(err) => {
                this.state.settle(OperationState::Failed);
                Err(OperationError::Failed(err))
            }
        })
    }
}

impl<F, T, E> Cancellable for Operation<F>
where
    F: Future<Output = Result<T, E>>,
{
    fn cancel_token(&self) -> &CancelToken {
        &self.token
    }
}

#[pinned_drop]
impl<F> PinnedDrop for Operation<F> {
    fn drop(self: Pin<&mut Self>) {
        if self.state.settle(OperationState::Cancelled) {
            tracing::trace!("pending operation dropped");
        }
    }
}

/// An observer of an [`Operation`]'s lifecycle.
///
/// It can read the state and request cancellation, but never sees the
/// operation's result.
#[derive(Debug, Clone)]
pub struct OperationWatch {
    token: CancelToken,
    state: StateCell<OperationState>,
}

impl OperationWatch {
    /// The current lifecycle state.
    pub fn state(&self) -> OperationState {
        self.state.get()
    }

    /// Returns `true` once the operation reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cancellation of the observed operation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if cancellation was requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}
