//! Folding executor: deduplicates equivalent submissions over a worker pool.
//!
//! Submission flow:
//!
//! 1. derive the fold key and look it up in the registry;
//! 2. if an entry exists, offer the task to it (`QueueEntry::try_fold`);
//!    success returns the entry's shared handle;
//! 3. otherwise evict the unfoldable entry (compare-and-remove), build a new
//!    entry and try to insert it; losing that race restarts at step 1;
//! 4. the winner hands the generation job to the pool.
//!
//! Lock order is always registry -> entry. The generation job never holds an
//! entry lock while it touches the registry.

use futures::future::Abortable;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::domain::errors::{SubmitError, SubmitResult, TaskError};
use crate::domain::models::{Config, DedupPolicy};
use crate::domain::ports::{Action, Job, Task, WorkerPool};
use crate::services::action_adapter::ActionTask;
use crate::services::queue_entry::QueueEntry;
use crate::services::registry::Registry;
use crate::services::task_handle::{ResultSender, TaskHandle};

type EntryRegistry<T> = Registry<<T as Task>::Key, QueueEntry<T>>;

const DEFAULT_MAX_FOLD_ATTEMPTS: u32 = 64;

/// Snapshot of executor activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// Submissions that passed validation.
    pub submitted: u64,
    /// Submissions absorbed by an existing entry.
    pub folded: u64,
    /// Generations handed to the worker pool.
    pub spawned: u64,
    /// Generations the worker pool refused.
    pub rejected: u64,
    /// Unfoldable entries evicted to make room for a new generation.
    pub evicted: u64,
    /// Generations whose body finished successfully.
    pub succeeded: u64,
    /// Generations that failed, panicked or were cancelled after starting.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    folded: AtomicU64,
    spawned: AtomicU64,
    rejected: AtomicU64,
    evicted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            folded: self.folded.load(Ordering::Relaxed),
            spawned: self.spawned.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Decorator over a [`WorkerPool`] that folds equivalent submissions.
///
/// # Examples
///
/// ```no_run
/// use foldex::domain::models::DedupPolicy;
/// use foldex::infrastructure::pool::TokioWorkerPool;
/// use foldex::services::FoldingExecutor;
/// # use async_trait::async_trait;
/// # struct Rebuild(String);
/// # #[async_trait]
/// # impl foldex::domain::ports::Task for Rebuild {
/// #     type Key = String;
/// #     type Output = ();
/// #     fn fold_key(&self) -> String { self.0.clone() }
/// #     async fn run(self) -> anyhow::Result<()> { Ok(()) }
/// # }
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = TokioWorkerPool::new(tokio::runtime::Handle::current(), 4, 1024);
/// let executor = FoldingExecutor::new(pool, DedupPolicy::Replace);
///
/// let first = executor.submit(Rebuild("docs".into()))?;
/// let second = executor.submit(Rebuild("docs".into()))?;
/// assert!(first.ptr_eq(&second));
/// first.await?;
/// # Ok(())
/// # }
/// ```
pub struct FoldingExecutor<T: Task, P: WorkerPool> {
    pool: P,
    policy: DedupPolicy,
    max_fold_attempts: u32,
    registry: Arc<EntryRegistry<T>>,
    counters: Arc<Counters>,
}

impl<T: Task, P: WorkerPool> FoldingExecutor<T, P> {
    pub fn new(pool: P, policy: DedupPolicy) -> Self {
        Self {
            pool,
            policy,
            max_fold_attempts: DEFAULT_MAX_FOLD_ATTEMPTS,
            registry: Arc::new(Registry::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Build an executor using the policy and retry bound from `config`.
    pub fn from_config(config: &Config, pool: P) -> Self {
        Self::new(pool, config.policy).with_max_fold_attempts(config.max_fold_attempts)
    }

    /// Bound the registry retry loop. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_fold_attempts(mut self, attempts: u32) -> Self {
        self.max_fold_attempts = attempts.max(1);
        self
    }

    /// Submit a task, folding it into an equivalent pending one if possible.
    ///
    /// Runs entirely on the calling thread and never suspends.
    ///
    /// # Errors
    ///
    /// * `SubmitError::InvalidSubmission` - `Task::validate` refused the task
    /// * `SubmitError::Rejected` - the pool refused the new generation
    /// * `SubmitError::Contended` - the registry retry bound was exhausted
    pub fn submit(&self, task: T) -> SubmitResult<TaskHandle<T::Output>> {
        task.validate().map_err(SubmitError::InvalidSubmission)?;
        Counters::bump(&self.counters.submitted);

        let key = task.fold_key();
        let mut task = task;

        for attempt in 1..=self.max_fold_attempts {
            task = match self.fold_into_existing(&key, task) {
                Ok(handle) => return Ok(handle),
                Err(task) => task,
            };

            let (entry, sender) = QueueEntry::new(task, self.policy);
            let entry = Arc::new(entry);
            if self.registry.insert_if_absent(key.clone(), Arc::clone(&entry)) {
                return self.dispatch(entry, sender);
            }

            // Lost the insert race: the entry was never visible to anyone else.
            trace!(key = ?key, attempt, "lost registry insert race, retrying");
            task = match entry.reclaim() {
                Some(task) => task,
                None => return Err(self.contended(&key)),
            };
        }

        // The winner of the last insert race may still accept this task.
        self.fold_into_existing(&key, task).map_err(|_| self.contended(&key))
    }

    /// Fold `task` into the live entry for `key`.
    ///
    /// Hands the task back if there is no entry or it refused the fold; a
    /// refusing entry is evicted so the caller can insert a fresh one.
    fn fold_into_existing(&self, key: &T::Key, task: T) -> Result<TaskHandle<T::Output>, T> {
        let Some(existing) = self.registry.lookup(key) else {
            return Err(task);
        };

        match existing.try_fold(task) {
            Ok(outcome) => {
                Counters::bump(&self.counters.folded);
                debug!(
                    key = ?key,
                    entry_id = %existing.id(),
                    outcome = outcome.as_str(),
                    policy = %self.policy,
                    "folded submission into pending entry"
                );
                Ok(existing.handle().clone())
            }
            Err(returned) => {
                if self.registry.remove_if_entry(key, &existing) {
                    Counters::bump(&self.counters.evicted);
                    trace!(
                        key = ?key,
                        entry_id = %existing.id(),
                        state = %existing.state(),
                        "evicted unfoldable entry"
                    );
                }
                Err(returned)
            }
        }
    }

    fn contended(&self, key: &T::Key) -> SubmitError {
        warn!(
            key = ?key,
            attempts = self.max_fold_attempts,
            "giving up on contended fold key"
        );
        SubmitError::Contended {
            attempts: self.max_fold_attempts,
        }
    }

    fn dispatch(
        &self,
        entry: Arc<QueueEntry<T>>,
        sender: ResultSender<T::Output>,
    ) -> SubmitResult<TaskHandle<T::Output>> {
        let handle = entry.handle().clone();
        let span = info_span!(
            "fold_generation",
            entry_id = %entry.id(),
            key = ?entry.key(),
            policy = %self.policy,
        );
        let generation = Generation {
            guard: GenerationGuard {
                registry: Arc::clone(&self.registry),
                entry: Arc::clone(&entry),
            },
            sender,
            counters: Arc::clone(&self.counters),
        };
        let job: Job = generation.run().instrument(span).boxed();

        match self.pool.spawn(job) {
            Ok(()) => {
                Counters::bump(&self.counters.spawned);
                debug!(
                    key = ?entry.key(),
                    entry_id = %entry.id(),
                    policy = %self.policy,
                    "started new generation"
                );
                Ok(handle)
            }
            Err(err) => {
                Counters::bump(&self.counters.rejected);
                self.registry.remove_if_entry(entry.key(), &entry);
                entry.complete();
                warn!(
                    key = ?entry.key(),
                    entry_id = %entry.id(),
                    error = %err,
                    "worker pool rejected generation"
                );
                Err(err.into())
            }
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn max_fold_attempts(&self) -> u32 {
        self.max_fold_attempts
    }

    /// Number of keys that currently have a live entry.
    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Whether `key` currently has a live entry.
    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.registry.contains_key(key)
    }

    pub fn stats(&self) -> ExecutorStats {
        self.counters.snapshot()
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn shutdown_now(&self) {
        self.pool.shutdown_now();
    }

    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    pub fn is_terminated(&self) -> bool {
        self.pool.is_terminated()
    }

    pub async fn await_termination(&self, timeout: Duration) -> bool {
        self.pool.await_termination(timeout).await
    }
}

impl<A, V, P> FoldingExecutor<ActionTask<A, V>, P>
where
    A: Action,
    V: Clone + Send + Sync + 'static,
    P: WorkerPool,
{
    /// Submit an action whose handle resolves to `value` once it has run.
    pub fn submit_action_with(&self, action: A, value: V) -> SubmitResult<TaskHandle<V>> {
        self.submit(ActionTask::with_value(action, value))
    }
}

impl<A, P> FoldingExecutor<ActionTask<A>, P>
where
    A: Action,
    P: WorkerPool,
{
    /// Fire-and-forget submission of a side-effecting action.
    ///
    /// Folds by the action's own key; the returned handle can be ignored.
    pub fn execute(&self, action: A) -> SubmitResult<TaskHandle<()>> {
        self.submit(ActionTask::new(action))
    }
}

/// Retires a generation from the registry when dropped.
///
/// Covers every exit of the job: normal completion, panics, and the pool
/// dropping the job without running it.
struct GenerationGuard<T: Task> {
    registry: Arc<EntryRegistry<T>>,
    entry: Arc<QueueEntry<T>>,
}

impl<T: Task> GenerationGuard<T> {
    fn release_key(&self) -> bool {
        self.registry.remove_if_entry(self.entry.key(), &self.entry)
    }
}

impl<T: Task> Drop for GenerationGuard<T> {
    fn drop(&mut self) {
        self.release_key();
        self.entry.complete();
    }
}

/// The job handed to the pool for one generation.
struct Generation<T: Task> {
    guard: GenerationGuard<T>,
    sender: ResultSender<T::Output>,
    counters: Arc<Counters>,
}

impl<T: Task> Generation<T> {
    async fn run(self) {
        let Self {
            guard,
            sender,
            counters,
        } = self;
        let (tx, abort) = sender.into_parts();

        let Some(task) = guard.entry.start() else {
            return;
        };
        trace!(entry_id = %guard.entry.id(), "queued -> running");

        if !guard.entry.policy().foldable_while_running() {
            guard.release_key();
        }

        let outcome = AssertUnwindSafe(Abortable::new(task.run(), abort))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(TaskError::failed(err)),
            Ok(Err(_aborted)) => Err(TaskError::Cancelled),
            Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
        };

        match &result {
            Ok(_) => Counters::bump(&counters.succeeded),
            Err(err) => {
                Counters::bump(&counters.failed);
                debug!(entry_id = %guard.entry.id(), error = %err, "generation failed");
            }
        }

        // Leave the registry before resolving the handle, so a caller that
        // observed the result always starts a fresh generation.
        drop(guard);
        let _ = tx.send(result);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
