use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::PoolError;

/// A job handed to the worker pool.
///
/// The job already carries its own result plumbing; the pool only has to
/// drive it to completion (or drop it when shutting down hard).
pub type Job = BoxFuture<'static, ()>;

/// Port for the worker pool that executes accepted jobs.
///
/// Ordering between non-equivalent jobs, queueing and threading are entirely
/// the pool's business. Lifecycle methods are passed straight through by the
/// folding executor.
#[async_trait]
pub trait WorkerPool: Send + Sync + 'static {
    /// Accept a job for execution.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job will eventually be polled (unless the pool is shut down hard)
    /// * `Err(PoolError)` - The job was refused and dropped
    fn spawn(&self, job: Job) -> Result<(), PoolError>;

    /// Stop accepting new jobs; already accepted jobs still run.
    fn shutdown(&self);

    /// Stop accepting new jobs and drop the ones that have not started.
    fn shutdown_now(&self);

    fn is_shutdown(&self) -> bool;

    /// True once shut down and every accepted job has finished or been dropped.
    fn is_terminated(&self) -> bool;

    /// Wait until terminated or until `timeout` elapses.
    ///
    /// Returns `true` if the pool terminated within the timeout.
    async fn await_termination(&self, timeout: Duration) -> bool;
}

#[async_trait]
impl<P: WorkerPool + ?Sized> WorkerPool for Arc<P> {
    fn spawn(&self, job: Job) -> Result<(), PoolError> {
        (**self).spawn(job)
    }

    fn shutdown(&self) {
        (**self).shutdown();
    }

    fn shutdown_now(&self) {
        (**self).shutdown_now();
    }

    fn is_shutdown(&self) -> bool {
        (**self).is_shutdown()
    }

    fn is_terminated(&self) -> bool {
        (**self).is_terminated()
    }

    async fn await_termination(&self, timeout: Duration) -> bool {
        (**self).await_termination(timeout).await
    }
}
