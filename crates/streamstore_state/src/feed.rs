//! Change feed for observing state transitions.
//!
//! The feed emits an event for every state save, enabling reactive
//! consumers (UI adapters, sync layers) to rebuild their snapshot when a
//! stream moves between settled, loading, and error.
//!
//! Events are emitted in save order; the engine's per-key write ordering
//! therefore carries over to subscribers.

use crate::store::{MemoryStateStore, StateStore};
use parking_lot::RwLock;
use std::hash::Hash;
use std::sync::mpsc::{self, Receiver, Sender};

/// A single state transition observed on the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent<K, S> {
    /// Key of the stream that transitioned.
    pub key: K,
    /// The newly persisted state.
    pub state: S,
}

/// Distributes state transitions to subscribers.
///
/// - Emits every save, in order
/// - Supports multiple subscribers
/// - Disconnected subscribers are pruned on emit
pub struct StateFeed<K, S> {
    subscribers: RwLock<Vec<Sender<StateEvent<K, S>>>>,
}

impl<K, S> StateFeed<K, S>
where
    K: Clone,
    S: Clone,
{
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to the feed.
    ///
    /// Returns a receiver that will see all future state events. The
    /// receiver should be drained regularly to avoid unbounded growth.
    pub fn subscribe(&self) -> Receiver<StateEvent<K, S>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers, pruning disconnected ones.
    pub fn emit(&self, event: StateEvent<K, S>) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<K, S> Default for StateFeed<K, S>
where
    K: Clone,
    S: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A state store that publishes every save to a [`StateFeed`].
///
/// This is the stream adapter's storage side: `load` serves the current
/// snapshot, [`FeedStateStore::subscribe`] delivers changes as they are
/// persisted.
pub struct FeedStateStore<K, S> {
    inner: MemoryStateStore<K, S>,
    feed: StateFeed<K, S>,
}

impl<K, S> FeedStateStore<K, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    S: Default + Clone + Send + Sync,
{
    /// Creates an empty publishing store.
    pub fn new() -> Self {
        Self {
            inner: MemoryStateStore::new(),
            feed: StateFeed::new(),
        }
    }

    /// Subscribes to state transitions across all keys.
    pub fn subscribe(&self) -> Receiver<StateEvent<K, S>> {
        self.feed.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }
}

impl<K, S> Default for FeedStateStore<K, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    S: Default + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> StateStore<K, S> for FeedStateStore<K, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    S: Default + Clone + Send + Sync,
{
    fn load(&self, key: &K) -> S {
        self.inner.load(key)
    }

    fn save(&self, key: &K, state: S) {
        self.inner.save(key, state.clone());
        self.feed.emit(StateEvent {
            key: key.clone(),
            state,
        });
    }
}
