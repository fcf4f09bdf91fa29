//! Registry of live queue entries keyed by equivalence key.
//!
//! The registry is the only place that decides whether an equivalent task is
//! already pending. Every operation takes the single map lock, so callers
//! never observe two entries for one key. Removal is compare-and-remove on
//! entry identity: a worker retiring an old generation can never evict the
//! fresh entry a submitter inserted after it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Concurrent key -> entry map holding at most one entry per key.
#[derive(Debug)]
pub struct Registry<K, E> {
    entries: Mutex<HashMap<K, Arc<E>>>,
}

impl<K, E> Registry<K, E>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Current entry for `key`, if any.
    pub fn lookup(&self, key: &K) -> Option<Arc<E>> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert `entry` unless `key` is already taken.
    ///
    /// Returns `false` (and leaves the map untouched) when another entry
    /// holds the key.
    pub fn insert_if_absent(&self, key: K, entry: Arc<E>) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, entry);
        true
    }

    /// Remove `key` only if it still maps to exactly `entry`.
    pub fn remove_if_entry(&self, key: &K, entry: &Arc<E>) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, E> Default for Registry<K, E>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}
