use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info};

use crate::domain::errors::PoolError;
use crate::domain::models::PoolConfig;
use crate::domain::ports::{Job, WorkerPool};

/// Worker pool running jobs on a tokio runtime.
///
/// At most `max_concurrency` jobs run at once; the rest wait for a permit and
/// count as queued. `queue_capacity` bounds queued + running jobs. `spawn`
/// only needs the runtime handle, so it can be called from any thread.
#[derive(Clone)]
pub struct TokioWorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    runtime: Handle,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    queue_capacity: usize,
    outstanding: AtomicUsize,
    shutdown: AtomicBool,
    idle: Notify,
}

impl PoolInner {
    fn is_terminated(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst) && self.outstanding.load(Ordering::SeqCst) == 0
    }
}

/// Releases a backlog slot when a job finishes or is dropped.
struct SlotGuard(Arc<PoolInner>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let remaining = self.0.outstanding.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && self.0.shutdown.load(Ordering::SeqCst) {
            self.0.idle.notify_waiters();
        }
    }
}

impl TokioWorkerPool {
    /// Create a pool on `runtime`.
    ///
    /// `max_concurrency` is raised to 1 and `queue_capacity` to
    /// `max_concurrency` if given smaller values.
    pub fn new(runtime: Handle, max_concurrency: usize, queue_capacity: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let queue_capacity = queue_capacity.max(max_concurrency);
        Self {
            inner: Arc::new(PoolInner {
                runtime,
                permits: Arc::new(Semaphore::new(max_concurrency)),
                max_concurrency,
                queue_capacity,
                outstanding: AtomicUsize::new(0),
                shutdown: AtomicBool::new(false),
                idle: Notify::new(),
            }),
        }
    }

    pub fn from_config(config: &PoolConfig, runtime: Handle) -> Self {
        Self::new(runtime, config.max_concurrency, config.queue_capacity)
    }

    /// Create a pool on the runtime the caller is running in.
    pub fn current(config: &PoolConfig) -> Result<Self> {
        let runtime = Handle::try_current().context("TokioWorkerPool requires a tokio runtime")?;
        Ok(Self::from_config(config, runtime))
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.queue_capacity
    }

    /// Jobs accepted and not yet finished (queued + running).
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Jobs currently holding an execution permit.
    pub fn running(&self) -> usize {
        self.inner
            .max_concurrency
            .saturating_sub(self.inner.permits.available_permits())
    }
}

#[async_trait]
impl WorkerPool for TokioWorkerPool {
    fn spawn(&self, job: Job) -> Result<(), PoolError> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(PoolError::Shutdown);
        }

        let capacity = self.inner.queue_capacity;
        self.inner
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map_err(|_| PoolError::Saturated { capacity })?;

        let slot = SlotGuard(Arc::clone(&self.inner));
        let permits = Arc::clone(&self.inner.permits);
        self.inner.runtime.spawn(async move {
            let _slot = slot;
            // A closed semaphore means shutdown_now: drop the job unrun.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        });
        Ok(())
    }

    fn shutdown(&self) {
        if !self.inner.shutdown.swap(true, Ordering::SeqCst) {
            info!(outstanding = self.outstanding(), "worker pool shutting down");
        }
        if self.inner.is_terminated() {
            self.inner.idle.notify_waiters();
        }
    }

    fn shutdown_now(&self) {
        self.shutdown();
        self.inner.permits.close();
        debug!("worker pool closed; queued jobs will be dropped");
    }

    fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    async fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.is_terminated() {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.inner.is_terminated();
            }
        }
    }
}

impl std::fmt::Debug for TokioWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioWorkerPool")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("queue_capacity", &self.inner.queue_capacity)
            .field("outstanding", &self.outstanding())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
