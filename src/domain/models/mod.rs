pub mod config;
pub mod policy;

pub use config::{Config, LogFormat, LoggingConfig, PoolConfig, RotationPolicy};
pub use policy::{DedupPolicy, EntryId, EntryState, FoldOutcome};
