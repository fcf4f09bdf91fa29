//! Adapter turning fire-and-forget actions into foldable tasks.
//!
//! The wrapper must not introduce an identity of its own: two adapters around
//! equivalent actions have to land in the same fold group, so the key,
//! equality and hash are all forwarded to the wrapped action.

use async_trait::async_trait;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::ports::{Action, Task};

/// A [`Task`] that performs an [`Action`] and then yields a fixed value.
pub struct ActionTask<A, V = ()> {
    action: A,
    value: V,
}

impl<A: Action> ActionTask<A> {
    pub fn new(action: A) -> Self {
        Self { action, value: () }
    }
}

impl<A: Action, V> ActionTask<A, V> {
    /// Wrap `action` so its handle resolves to `value` once it has run.
    pub fn with_value(action: A, value: V) -> Self {
        Self { action, value }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn into_inner(self) -> A {
        self.action
    }
}

#[async_trait]
impl<A, V> Task for ActionTask<A, V>
where
    A: Action,
    V: Clone + Send + Sync + 'static,
{
    type Key = A::Key;
    type Output = V;

    fn fold_key(&self) -> A::Key {
        self.action.fold_key()
    }

    fn validate(&self) -> Result<(), String> {
        self.action.validate()
    }

    async fn run(self) -> anyhow::Result<V> {
        self.action.perform().await?;
        Ok(self.value)
    }
}

impl<A: PartialEq, V> PartialEq for ActionTask<A, V> {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
    }
}

impl<A: Eq, V> Eq for ActionTask<A, V> {}

impl<A: Hash, V> Hash for ActionTask<A, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.action.hash(state);
    }
}

impl<A: fmt::Debug, V> fmt::Debug for ActionTask<A, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionTask").field(&self.action).finish()
    }
}
