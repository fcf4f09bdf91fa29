//! Port trait definitions (Hexagonal Architecture)
//!
//! - `Task` / `Action`: units of work and their equivalence contract
//! - `WorkerPool`: the executor that actually runs accepted jobs
//!
//! The folding executor is written against these traits only, so any pool
//! implementation (tokio, a test double, a custom thread pool) can sit under it.

pub mod task;
pub mod worker_pool;

pub use task::{Action, Task};
pub use worker_pool::{Job, WorkerPool};
