//! Per-generation queue entry and its fold decision.
//!
//! ```text
//! Queued ──start()──► Running ──complete()──► Completed
//!   ▲  │
//!   └──┘ try_fold() (Replace: swap body, Discard: drop newcomer)
//! ```
//!
//! The task slot and the state live under one mutex, so a replacement can
//! never slip in between the worker observing `Queued` and taking the body.

use parking_lot::Mutex;
use std::fmt;

use crate::domain::models::{DedupPolicy, EntryId, EntryState, FoldOutcome};
use crate::domain::ports::Task;
use crate::services::task_handle::{ResultSender, TaskHandle};

struct Slot<T> {
    task: Option<T>,
    state: EntryState,
    replacements: u32,
}

/// Mutable holder for one fold group's pending work.
pub struct QueueEntry<T: Task> {
    id: EntryId,
    key: T::Key,
    policy: DedupPolicy,
    slot: Mutex<Slot<T>>,
    handle: TaskHandle<T::Output>,
}

impl<T: Task> QueueEntry<T> {
    /// Create a queued entry together with the sender that resolves its handle.
    pub(crate) fn new(task: T, policy: DedupPolicy) -> (Self, ResultSender<T::Output>) {
        let id = EntryId::new();
        let key = task.fold_key();
        let (handle, sender) = TaskHandle::channel(id);
        let entry = Self {
            id,
            key,
            policy,
            slot: Mutex::new(Slot {
                task: Some(task),
                state: EntryState::Queued,
                replacements: 0,
            }),
            handle,
        };
        (entry, sender)
    }

    /// Offer an equivalent task to this entry.
    ///
    /// Returns the task back as `Err` when the entry no longer accepts folds:
    /// it is running under [`DedupPolicy::Replace`], its handle was cancelled,
    /// or it has completed.
    pub fn try_fold(&self, task: T) -> Result<FoldOutcome, T> {
        if self.handle.is_cancelled() {
            return Err(task);
        }

        let mut slot = self.slot.lock();
        match (self.policy, slot.state) {
            (_, EntryState::Completed) => Err(task),
            (DedupPolicy::Discard, _) => Ok(FoldOutcome::Discarded),
            (DedupPolicy::Replace, EntryState::Queued) => {
                slot.task = Some(task);
                slot.replacements += 1;
                Ok(FoldOutcome::Replaced)
            }
            (DedupPolicy::Replace, EntryState::Running) => Err(task),
        }
    }

    /// Queued -> Running. Hands out the body to execute.
    ///
    /// Returns `None` if the entry already left `Queued`.
    pub(crate) fn start(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        if slot.state != EntryState::Queued {
            return None;
        }
        slot.state = EntryState::Running;
        slot.task.take()
    }

    /// Mark the generation finished. Idempotent.
    pub(crate) fn complete(&self) {
        let mut slot = self.slot.lock();
        slot.state = EntryState::Completed;
        slot.task = None;
    }

    /// Take the body back out of an entry that was never published.
    pub(crate) fn reclaim(&self) -> Option<T> {
        self.slot.lock().task.take()
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn key(&self) -> &T::Key {
        &self.key
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn state(&self) -> EntryState {
        self.slot.lock().state
    }

    /// Number of times the queued body was swapped.
    pub fn replacements(&self) -> u32 {
        self.slot.lock().replacements
    }

    pub fn handle(&self) -> &TaskHandle<T::Output> {
        &self.handle
    }
}

impl<T: Task> fmt::Debug for QueueEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
