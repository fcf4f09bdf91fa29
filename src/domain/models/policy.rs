//! Dedup policy and queue-entry state models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a duplicate submission is folded into an existing entry.
///
/// Fixed when the executor is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// A duplicate replaces the body of a still-queued entry. Once the entry
    /// is running it leaves the registry and duplicates start a new generation.
    #[default]
    Replace,
    /// A duplicate is dropped while an equivalent entry is queued or running;
    /// the caller shares the existing handle.
    Discard,
}

impl DedupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Discard => "discard",
        }
    }

    /// Whether the entry stays in the registry while its body executes.
    pub fn foldable_while_running(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "discard" => Ok(Self::Discard),
            other => Err(format!(
                "unknown dedup policy '{other}', expected 'replace' or 'discard'"
            )),
        }
    }
}

/// Lifecycle of a queue entry. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Queued,
    Running,
    Completed,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one generation (one queue entry) for logs and handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a duplicate task was absorbed by an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// The queued body was swapped for the new task.
    Replaced,
    /// The new task was dropped; the entry keeps its body.
    Discarded,
}

impl FoldOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Discarded => "discarded",
        }
    }
}
