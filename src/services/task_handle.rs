//! Shared result handle returned by every submission.
//!
//! All callers folded into one generation receive clones of the same handle.
//! The handle resolves once, and each clone observes the same value or the
//! same error. Cancelling any clone cancels the single execution they share.

use futures::channel::oneshot;
use futures::future::{AbortHandle, AbortRegistration, BoxFuture, Shared};
use futures::FutureExt;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;

use crate::domain::errors::TaskError;
use crate::domain::models::EntryId;

type SharedResult<V> = Shared<BoxFuture<'static, Result<V, TaskError>>>;

/// Sending half of a generation's result, held by the job.
pub(crate) struct ResultSender<V> {
    tx: oneshot::Sender<Result<V, TaskError>>,
    abort: AbortRegistration,
}

impl<V> ResultSender<V> {
    pub(crate) fn into_parts(
        self,
    ) -> (oneshot::Sender<Result<V, TaskError>>, AbortRegistration) {
        (self.tx, self.abort)
    }
}

/// Cloneable, awaitable handle to the outcome of one generation.
pub struct TaskHandle<V> {
    inner: Arc<HandleInner<V>>,
}

struct HandleInner<V> {
    entry_id: EntryId,
    result: SharedResult<V>,
    abort: AbortHandle,
}

impl<V> TaskHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a handle and the sender that resolves it.
    ///
    /// If the sender is dropped without sending, the handle resolves to
    /// [`TaskError::Cancelled`].
    pub(crate) fn channel(entry_id: EntryId) -> (Self, ResultSender<V>) {
        let (tx, rx) = oneshot::channel();
        let (abort, registration) = AbortHandle::new_pair();
        let result = rx
            .map(|received| received.unwrap_or(Err(TaskError::Cancelled)))
            .boxed()
            .shared();

        let handle = Self {
            inner: Arc::new(HandleInner {
                entry_id,
                result,
                abort,
            }),
        };
        let sender = ResultSender {
            tx,
            abort: registration,
        };
        (handle, sender)
    }

    /// Block the current thread until the result is available.
    ///
    /// Must not be called from inside an async runtime worker; await the
    /// handle there instead.
    pub fn wait(&self) -> Result<V, TaskError> {
        futures::executor::block_on(self.inner.result.clone())
    }

    /// The result if the generation has already finished.
    pub fn try_result(&self) -> Option<Result<V, TaskError>> {
        if let Some(result) = self.inner.result.peek() {
            return Some(result.clone());
        }
        self.inner.result.clone().now_or_never()
    }

    pub fn is_done(&self) -> bool {
        self.try_result().is_some()
    }
}

impl<V> TaskHandle<V> {
    /// Request cancellation of the shared execution.
    ///
    /// A queued body never starts; a running body is dropped at its next
    /// suspension point. Every folded holder observes `TaskError::Cancelled`.
    pub fn cancel(&self) {
        self.inner.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.abort.is_aborted()
    }

    /// Identifier of the generation behind this handle.
    pub fn entry_id(&self) -> EntryId {
        self.inner.entry_id
    }

    /// True if both handles belong to the same generation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<V> Clone for TaskHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for TaskHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("entry_id", &self.inner.entry_id)
            .field("cancelled", &self.inner.abort.is_aborted())
            .finish_non_exhaustive()
    }
}

impl<V> IntoFuture for TaskHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = Result<V, TaskError>;
    type IntoFuture = SharedResult<V>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner.result.clone()
    }
}

impl<V> IntoFuture for &TaskHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = Result<V, TaskError>;
    type IntoFuture = SharedResult<V>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner.result.clone()
    }
}
