//! Simplified single-axis variant.
//!
//! For list streams that only ever grow at the tail, the two pagination
//! edges collapse into one `reached_last` flag and "fetch more" becomes
//! an `additional` flag on the request instead of a request type. The
//! behavior is a strict subset of the full selector and shares its
//! persistence ordering: the in-flight state is persisted before the
//! origin call, under the same per-key lock discipline.

use crate::error::StoreResult;
use crate::locks::KeyLocks;
use crate::supervisor::FetchSupervisor;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use streamstore_state::{FetchError, PagingState, StateStore};
use tracing::debug;

/// Cache port for the single-axis variant.
///
/// Saves always receive the full merged list; `additional` marks saves
/// produced by an additional request so delta-persisting
/// implementations can skip rewriting rows they already hold.
pub trait PagingCacheStore<I>: Send + Sync {
    /// Loads the cached list, `None` when absent.
    fn load(&self) -> StoreResult<Option<Vec<I>>>;

    /// Saves (or clears) the cached list.
    fn save(&self, data: Option<Vec<I>>, additional: bool) -> StoreResult<()>;
}

/// Origin port for the single-axis variant.
pub trait PagingOriginStore<I>: Send + Sync {
    /// Fetches either the first page (`additional = false`) or the next
    /// page after the cached snapshot.
    fn fetch(&self, cached: Option<&[I]>, additional: bool) -> Result<Vec<I>, FetchError>;
}

/// An in-memory list cache for the single-axis variant.
pub struct MemoryPagingCache<I> {
    data: parking_lot::RwLock<Option<Vec<I>>>,
}

impl<I> MemoryPagingCache<I> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            data: parking_lot::RwLock::new(None),
        }
    }
}

impl<I> Default for MemoryPagingCache<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> PagingCacheStore<I> for MemoryPagingCache<I>
where
    I: Clone + Send + Sync,
{
    fn load(&self) -> StoreResult<Option<Vec<I>>> {
        Ok(self.data.read().clone())
    }

    fn save(&self, data: Option<Vec<I>>, _additional: bool) -> StoreResult<()> {
        *self.data.write() = data;
        Ok(())
    }
}

type NeedRefresh<I> = Arc<dyn Fn(&[I]) -> bool + Send + Sync>;

/// The engine for one append-only list stream.
pub struct PagingSelector<K, I, S, C, O> {
    key: K,
    states: Arc<S>,
    cache: Arc<C>,
    origin: Arc<O>,
    need_refresh: NeedRefresh<I>,
    lock: Arc<Mutex<()>>,
    supervisor: Arc<FetchSupervisor>,
}

impl<K, I, S, C, O> Clone for PagingSelector<K, I, S, C, O>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            states: Arc::clone(&self.states),
            cache: Arc::clone(&self.cache),
            origin: Arc::clone(&self.origin),
            need_refresh: Arc::clone(&self.need_refresh),
            lock: Arc::clone(&self.lock),
            supervisor: Arc::clone(&self.supervisor),
        }
    }
}

impl<K, I, S, C, O> PagingSelector<K, I, S, C, O>
where
    K: Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    S: StateStore<K, PagingState> + 'static,
    C: PagingCacheStore<I> + 'static,
    O: PagingOriginStore<I> + 'static,
{
    /// Creates a selector for one key.
    pub fn new(
        key: K,
        states: Arc<S>,
        cache: C,
        origin: O,
        need_refresh: impl Fn(&[I]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            states,
            cache: Arc::new(cache),
            origin: Arc::new(origin),
            need_refresh: Arc::new(need_refresh),
            lock: Arc::new(Mutex::new(())),
            supervisor: Arc::new(FetchSupervisor::new()),
        }
    }

    /// Uses a shared lock registry instead of a private lock.
    pub fn with_locks(mut self, locks: &KeyLocks<K>) -> Self
    where
        K: Eq + Hash,
    {
        self.lock = locks.lock_for(&self.key);
        self
    }

    /// Uses a shared supervisor for detached fetches.
    pub fn with_supervisor(mut self, supervisor: Arc<FetchSupervisor>) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Returns the current cached list verbatim.
    pub fn load(&self) -> StoreResult<Option<Vec<I>>> {
        self.cache.load()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> PagingState {
        self.states.load(&self.key)
    }

    /// Overwrites (or, when `additional`, extends) the list from
    /// outside the fetch pipeline and settles the state.
    ///
    /// `reached_last` is set when the merged list ends up empty.
    pub fn update(&self, new_data: Option<Vec<I>>, additional: bool) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let merged = if additional {
            let mut merged = self.cache.load()?.unwrap_or_default();
            merged.extend(new_data.unwrap_or_default());
            merged
        } else {
            new_data.unwrap_or_default()
        };
        let reached_last = merged.is_empty();
        self.cache.save(Some(merged), additional)?;
        self.states
            .save(&self.key, PagingState::Settled { reached_last });
        Ok(())
    }

    /// Applies the decision policy and fetches when warranted.
    ///
    /// On a settled state, fetch if the list is absent, `force_refresh`,
    /// the staleness predicate fires, or `additional` and the list is
    /// not complete. A loading state suppresses everything; an error
    /// state fetches only when `fetch_on_error` is set.
    pub fn request(
        &self,
        force_refresh: bool,
        clear_cache: bool,
        fetch_on_error: bool,
        additional: bool,
    ) -> StoreResult<()> {
        match self.decide_and_mark(force_refresh, clear_cache, fetch_on_error, additional)? {
            Some(cached) => self.fetch_new_data(cached, additional),
            None => Ok(()),
        }
    }

    /// Like [`PagingSelector::request`] but detached: returns once the
    /// loading state is persisted.
    pub fn request_detached(
        &self,
        force_refresh: bool,
        clear_cache: bool,
        fetch_on_error: bool,
        additional: bool,
    ) -> StoreResult<()> {
        // Decision and loading-state write still happen synchronously;
        // only the origin call and publication are detached.
        let cached =
            match self.decide_and_mark(force_refresh, clear_cache, fetch_on_error, additional)? {
                Some(cached) => cached,
                None => return Ok(()),
            };
        let selector = self.clone();
        self.supervisor.spawn(move || {
            if let Err(error) = selector.fetch_new_data(cached, additional) {
                tracing::error!(%error, "detached fetch could not publish its outcome");
            }
        });
        Ok(())
    }

    /// Decision policy plus the loading-state write, under the key lock.
    ///
    /// Returns the pre-fetch cache snapshot when a fetch should run.
    fn decide_and_mark(
        &self,
        force_refresh: bool,
        clear_cache: bool,
        fetch_on_error: bool,
        additional: bool,
    ) -> StoreResult<Option<Option<Vec<I>>>> {
        let _guard = self.lock.lock();
        let state = self.states.load(&self.key);
        let cached = self.cache.load()?;
        let fetch = match state {
            PagingState::Settled { reached_last } => match &cached {
                None => true,
                Some(data) => {
                    force_refresh || (self.need_refresh)(data) || (additional && !reached_last)
                }
            },
            PagingState::Loading => false,
            PagingState::Error(_) => fetch_on_error,
        };
        if !fetch {
            debug!(additional, "fetch suppressed");
            return Ok(None);
        }
        if clear_cache {
            self.cache.save(None, additional)?;
        }
        self.states.save(&self.key, PagingState::Loading);
        Ok(Some(cached))
    }

    /// Returns the supervisor owning this selector's detached fetches.
    pub fn supervisor(&self) -> &Arc<FetchSupervisor> {
        &self.supervisor
    }

    fn fetch_new_data(&self, cached: Option<Vec<I>>, additional: bool) -> StoreResult<()> {
        let outcome = self.origin.fetch(cached.as_deref(), additional);
        let _guard = self.lock.lock();
        match outcome {
            Ok(fetched) => {
                let reached_last = fetched.is_empty();
                let merged = if additional {
                    let mut merged = cached.unwrap_or_default();
                    merged.extend(fetched);
                    merged
                } else {
                    fetched
                };
                self.cache.save(Some(merged), additional)?;
                self.states
                    .save(&self.key, PagingState::Settled { reached_last });
            }
            Err(cause) => {
                self.states.save(&self.key, PagingState::Error(cause));
            }
        }
        Ok(())
    }
}
