//! Common test utilities for integration tests
//!
//! Provides the probe task, pool wrappers and helpers shared by the
//! integration test files.

#![allow(dead_code)]

use anyhow::bail;
use async_trait::async_trait;
use foldex::domain::errors::PoolError;
use foldex::domain::ports::{Job, Task, WorkerPool};
use foldex::infrastructure::pool::TokioWorkerPool;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Semaphore};

/// Shared log of which probe bodies actually ran.
#[derive(Debug, Default)]
pub struct Recorder {
    runs: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().len()
    }
}

/// Test task folding by `key`; its result is its own label.
#[derive(Debug)]
pub struct Probe {
    key: String,
    label: String,
    recorder: Arc<Recorder>,
    gate: Option<Arc<Semaphore>>,
    fail: bool,
}

impl Probe {
    pub fn new(key: &str, label: &str, recorder: &Arc<Recorder>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            recorder: Arc::clone(recorder),
            gate: None,
            fail: false,
        }
    }

    /// Block the body after it has been recorded until `gate` yields a permit.
    pub fn gated(mut self, gate: &Arc<Semaphore>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Task for Probe {
    type Key = String;
    type Output = String;

    fn fold_key(&self) -> String {
        self.key.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.key.is_empty() {
            return Err("probe key cannot be empty".to_string());
        }
        Ok(())
    }

    async fn run(self) -> anyhow::Result<String> {
        self.recorder.runs.lock().push(self.label.clone());
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await?;
        }
        if self.fail {
            bail!("probe {} failed", self.label);
        }
        Ok(self.label)
    }
}

/// Wrapper counting how many jobs reach the inner pool.
#[derive(Debug)]
pub struct CountingPool<P> {
    inner: P,
    spawned: AtomicUsize,
}

impl<P: WorkerPool> CountingPool<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            spawned: AtomicUsize::new(0),
        }
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<P: WorkerPool> WorkerPool for CountingPool<P> {
    fn spawn(&self, job: Job) -> Result<(), PoolError> {
        self.inner.spawn(job)?;
        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn shutdown_now(&self) {
        self.inner.shutdown_now();
    }

    fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }

    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    async fn await_termination(&self, timeout: Duration) -> bool {
        self.inner.await_termination(timeout).await
    }
}

/// Pool that parks jobs in FIFO order until the test runs them.
#[derive(Default)]
pub struct ManualPool {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualPool {
    pub fn queued(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Run the oldest parked job to completion on the current thread.
    pub fn run_next(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                futures::executor::block_on(job);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl WorkerPool for ManualPool {
    fn spawn(&self, job: Job) -> Result<(), PoolError> {
        self.jobs.lock().push_back(job);
        Ok(())
    }

    fn shutdown(&self) {}

    fn shutdown_now(&self) {
        self.jobs.lock().clear();
    }

    fn is_shutdown(&self) -> bool {
        false
    }

    fn is_terminated(&self) -> bool {
        false
    }

    async fn await_termination(&self, _timeout: Duration) -> bool {
        false
    }
}

/// Pool on the current runtime with a large backlog.
pub fn tokio_pool(max_concurrency: usize) -> TokioWorkerPool {
    TokioWorkerPool::new(Handle::current(), max_concurrency, 10_000)
}

/// Park a job on `pool` that holds one execution permit until the returned
/// sender is dropped or fired. Returns once the job is running.
pub async fn occupy<P: WorkerPool>(pool: &P) -> oneshot::Sender<()> {
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    pool.spawn(
        async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
        }
        .boxed(),
    )
    .expect("pool should accept the blocker job");
    started_rx.await.expect("blocker job should start");
    release_tx
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 10ms until it returns true or the timeout is
/// reached.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    predicate()
}
