use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;

/// A unit of work that can be folded with equivalent submissions.
///
/// Two tasks are equivalent iff their [`fold_key`](Task::fold_key)s are equal.
/// The key must be consistent with its `Hash` implementation. Tasks that have
/// no meaningful equivalence can return a key that is unique per instance
/// (for example a `Uuid` drawn at construction); they then only ever fold
/// with themselves.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use foldex::domain::ports::Task;
///
/// struct RefreshIndex {
///     index: String,
/// }
///
/// #[async_trait]
/// impl Task for RefreshIndex {
///     type Key = String;
///     type Output = usize;
///
///     fn fold_key(&self) -> String {
///         self.index.clone()
///     }
///
///     async fn run(self) -> anyhow::Result<usize> {
///         Ok(self.index.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + 'static {
    /// Equivalence key identifying the fold group.
    type Key: Hash + Eq + Clone + Debug + Send + Sync + 'static;

    /// Value shared by every caller folded into the same generation.
    type Output: Clone + Send + Sync + 'static;

    /// Derive the equivalence key.
    fn fold_key(&self) -> Self::Key;

    /// Reject a task before it touches the registry.
    ///
    /// Returning `Err` makes `submit` fail with `SubmitError::InvalidSubmission`.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Execute the task body.
    async fn run(self) -> anyhow::Result<Self::Output>;
}

/// A fire-and-forget unit of work.
///
/// Actions go through the executor's `execute` path, which wraps them in
/// [`ActionTask`](crate::services::ActionTask) so they fold by the action's
/// own key.
#[async_trait]
pub trait Action: Send + 'static {
    type Key: Hash + Eq + Clone + Debug + Send + Sync + 'static;

    fn fold_key(&self) -> Self::Key;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    async fn perform(self) -> anyhow::Result<()>;
}
