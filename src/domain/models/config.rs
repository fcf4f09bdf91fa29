use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::policy::DedupPolicy;

/// Main configuration structure for foldex
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Dedup policy applied to duplicate submissions
    #[serde(default)]
    pub policy: DedupPolicy,

    /// Upper bound on registry retries when concurrent submitters race
    #[serde(default = "default_max_fold_attempts")]
    pub max_fold_attempts: u32,

    /// Worker pool configuration
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

const fn default_max_fold_attempts() -> u32 {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: DedupPolicy::default(),
            max_fold_attempts: default_max_fold_attempts(),
            pool: PoolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolConfig {
    /// Maximum number of jobs executing at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum number of outstanding jobs (queued + running)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_max_concurrency() -> usize {
    4
}

const fn default_queue_capacity() -> usize {
    10_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (if None logs only to stdout)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Write log lines to stderr
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Log file rotation
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_console: default_true(),
            rotation: RotationPolicy::default(),
        }
    }
}
