//! Domain errors for the folding executor.

use std::sync::Arc;

use thiserror::Error;

/// Outcome error observed through a [`TaskHandle`](crate::services::TaskHandle).
///
/// Every caller folded into one generation sees the same value, so the error
/// has to be cheap to clone.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Task failed: {0}")]
    Failed(Arc<anyhow::Error>),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task was cancelled before it produced a result")]
    Cancelled,
}

impl TaskError {
    /// Wrap a task body error.
    pub fn failed(err: anyhow::Error) -> Self {
        Self::Failed(Arc::new(err))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors raised by the underlying worker pool when it refuses a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Worker pool has been shut down")]
    Shutdown,

    #[error("Worker pool is saturated: {capacity} jobs already outstanding")]
    Saturated { capacity: usize },
}

/// Errors returned synchronously from `submit`/`execute`.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Worker pool rejected the task: {0}")]
    Rejected(#[from] PoolError),

    #[error("Gave up folding after {attempts} contended registry attempts")]
    Contended { attempts: u32 },
}

pub type SubmitResult<T> = Result<T, SubmitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_clone_shares_source() {
        let err = TaskError::failed(anyhow::anyhow!("disk full"));
        let cloned = err.clone();
        match (err, cloned) {
            (TaskError::Failed(a), TaskError::Failed(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("Expected Failed variants"),
        }
    }

    #[test]
    fn test_pool_error_converts_into_submit_error() {
        let err: SubmitError = PoolError::Saturated { capacity: 8 }.into();
        assert!(matches!(
            err,
            SubmitError::Rejected(PoolError::Saturated { capacity: 8 })
        ));
        assert_eq!(
            err.to_string(),
            "Worker pool rejected the task: Worker pool is saturated: 8 jobs already outstanding"
        );
    }

    #[test]
    fn test_cancelled_display() {
        assert!(TaskError::Cancelled.is_cancelled());
        assert!(!TaskError::Panicked("boom".into()).is_cancelled());
        assert_eq!(
            TaskError::Cancelled.to_string(),
            "Task was cancelled before it produced a result"
        );
    }
}
