//! State persistence.
//!
//! A state store is pure key→state storage with no business logic. The
//! engine is the only writer; observers read through it or subscribe via
//! the change feed.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// Keyed storage for lifecycle states.
///
/// Generic over the state type so the two-axis engine and the simplified
/// paging variant share one storage abstraction. Implementations must be
/// `Send + Sync`; the engine serializes writes per key.
pub trait StateStore<K, S>: Send + Sync {
    /// Loads the state for a key.
    ///
    /// A key never written before yields the state's default (lazy
    /// creation on first access).
    fn load(&self, key: &K) -> S;

    /// Saves the state for a key.
    fn save(&self, key: &K, state: S);
}

/// An in-memory state store.
pub struct MemoryStateStore<K, S> {
    states: RwLock<HashMap<K, S>>,
}

impl<K, S> MemoryStateStore<K, S> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of keys with an explicitly saved state.
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Returns true if no state has been saved yet.
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl<K, S> Default for MemoryStateStore<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> StateStore<K, S> for MemoryStateStore<K, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    S: Default + Clone + Send + Sync,
{
    fn load(&self, key: &K) -> S {
        self.states.read().get(key).cloned().unwrap_or_default()
    }

    fn save(&self, key: &K, state: S) {
        self.states.write().insert(key.clone(), state);
    }
}
