//! Infrastructure layer module
//!
//! Adapters and ambient services around the folding core:
//! - Tokio-backed worker pool implementing the `WorkerPool` port
//! - Configuration management (figment)
//! - Logging infrastructure (tracing-subscriber)
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod pool;
