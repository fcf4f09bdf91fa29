//! Worker pool adapters
//!
//! `TokioWorkerPool` runs generation jobs on a tokio runtime with bounded
//! concurrency and a bounded backlog.

pub mod tokio_pool;

pub use tokio_pool::TokioWorkerPool;
