//! Folding services
//!
//! - `registry`: key -> live entry map with compare-and-remove
//! - `queue_entry`: per-generation state machine and fold decision
//! - `task_handle`: shared, cancellable result handle
//! - `folding_executor`: the submission facade over a `WorkerPool`
//! - `action_adapter`: fire-and-forget actions as foldable tasks

pub mod action_adapter;
pub mod folding_executor;
pub mod queue_entry;
pub mod registry;
pub mod task_handle;

pub use action_adapter::ActionTask;
pub use folding_executor::{ExecutorStats, FoldingExecutor};
pub use queue_entry::QueueEntry;
pub use registry::Registry;
pub use task_handle::TaskHandle;
