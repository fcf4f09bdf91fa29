//! foldex - a task-folding executor
//!
//! Submissions that share a fold key while an earlier one is still pending
//! collapse into a single unit of work. Every folded submitter receives a
//! handle to the same result, and the body runs once per generation.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): policies, configuration models, errors and
//!   the `Task`/`Action`/`WorkerPool` ports
//! - **Service Layer** (`services`): the folding executor, its registry,
//!   queue entries and result handles
//! - **Infrastructure Layer** (`infrastructure`): tokio worker pool, figment
//!   configuration, tracing setup
//! - **CLI Layer** (`cli`): the `foldex` binary
//!
//! # Example
//!
//! ```ignore
//! use foldex::{DedupPolicy, FoldingExecutor, PoolConfig, TokioWorkerPool};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = TokioWorkerPool::current(&PoolConfig::default())?;
//!     let executor = FoldingExecutor::new(pool, DedupPolicy::Replace);
//!     let first = executor.submit(RefreshIndex::new("users"))?;
//!     let second = executor.submit(RefreshIndex::new("users"))?;
//!     assert!(first.ptr_eq(&second));
//!     first.await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{PoolError, SubmitError, SubmitResult, TaskError};
pub use domain::models::{
    Config, DedupPolicy, EntryId, EntryState, FoldOutcome, LogFormat, LoggingConfig, PoolConfig,
    RotationPolicy,
};
pub use domain::ports::{Action, Job, Task, WorkerPool};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::pool::TokioWorkerPool;
pub use services::{ActionTask, ExecutorStats, FoldingExecutor, TaskHandle};
