//! Domain layer for the folding executor
//!
//! Core types shared by every layer: errors, policy and configuration models,
//! and the port traits (tasks, worker pools) the services are written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{PoolError, SubmitError, SubmitResult, TaskError};
