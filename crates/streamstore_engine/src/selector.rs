//! The per-key decision and transition engine.
//!
//! Every request runs the same shape: read state, decide, persist the
//! in-flight state, fetch, publish the outcome. The read-decide-persist
//! prefix and the outcome publication each hold the key lock; the fetch
//! itself runs unlocked so a slow origin never blocks readers or other
//! keys.

use crate::cache::CacheStore;
use crate::error::StoreResult;
use crate::locks::KeyLocks;
use crate::options::{FetchOptions, MergeDirection, RequestType};
use crate::origin::{FetchResult, OriginStore};
use crate::supervisor::FetchSupervisor;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use streamstore_state::{EdgeState, FetchError, StateStore, StreamState};
use tracing::{debug, error};

/// A consistent payload/state pair for one stream.
///
/// Read under the key lock, so observers never see a torn combination
/// of cache payload and lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    /// Current cached payload, `None` when absent.
    pub payload: Option<T>,
    /// Current lifecycle state.
    pub state: StreamState,
}

type NeedRefresh<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Outcome of the locked decision phase.
enum Decision<T> {
    /// Nothing to do; current state stands.
    Skip,
    /// Fetch, issued against this pre-fetch cache snapshot. The
    /// in-flight state is already persisted.
    Fetch(Option<T>),
}

/// The engine for one logical data stream.
///
/// Orchestrates reads and writes across the cache port, the origin port
/// and the state store, implementing the fetch-decision policy and the
/// state machine transitions. The key is bound at construction; the
/// state store may be shared across selectors and keys.
pub struct DataSelector<K, T, S, C, O> {
    key: K,
    states: Arc<S>,
    cache: Arc<C>,
    origin: Arc<O>,
    need_refresh: NeedRefresh<T>,
    lock: Arc<Mutex<()>>,
    supervisor: Arc<FetchSupervisor>,
}

impl<K, T, S, C, O> Clone for DataSelector<K, T, S, C, O>
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

impl<K, T, S, C, O> DataSelector<K, T, S, C, O>
where
    K: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
    S: StateStore<K, StreamState> + 'static,
    C: CacheStore<T> + 'static,
    O: OriginStore<T> + 'static,
{
    /// Creates a selector for one key.
    ///
    /// `cache` and `origin` are the per-key ports; `states` may be
    /// shared across selectors. `need_refresh` is the staleness
    /// predicate, consulted only on refresh requests with a non-empty
    /// cache.
    pub fn new(
        key: K,
        states: Arc<S>,
        cache: C,
        origin: O,
        need_refresh: impl Fn(&T) -> bool + Send + Sync + 'static,
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
    ///
    /// Required when multiple selectors reference the same key against
    /// shared stores.
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

    /// Returns the supervisor owning this selector's detached fetches.
    pub fn supervisor(&self) -> &Arc<FetchSupervisor> {
        &self.supervisor
    }

    /// Returns the current cached payload verbatim.
    ///
    /// Passive read: no side effects, no fetch.
    pub fn load(&self) -> StoreResult<Option<T>> {
        self.cache.load()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.states.load(&self.key)
    }

    /// Returns a consistent payload/state pair, read under the key lock.
    pub fn snapshot(&self) -> StoreResult<Snapshot<T>> {
        let _guard = self.lock.lock();
        Ok(Snapshot {
            payload: self.cache.load()?,
            state: self.states.load(&self.key),
        })
    }

    /// Requests a refresh of the whole payload.
    pub fn refresh(&self, options: FetchOptions) -> StoreResult<()> {
        self.request(RequestType::Refresh, options)
    }

    /// Requests the next page on the append edge.
    pub fn request_append(&self, options: FetchOptions) -> StoreResult<()> {
        self.request(RequestType::Append, options)
    }

    /// Requests the previous page on the prepend edge.
    pub fn request_prepend(&self, options: FetchOptions) -> StoreResult<()> {
        self.request(RequestType::Prepend, options)
    }

    /// Overwrites (or directionally merges) the payload from outside
    /// the fetch pipeline and forces the state to settled.
    ///
    /// Escape hatch for externally-sourced writes such as mutations. A
    /// directional update with an absent payload asserts "no more data"
    /// for that edge.
    pub fn update(&self, data: Option<T>, direction: Option<MergeDirection>) -> StoreResult<()> {
        let _guard = self.lock.lock();
        match direction {
            None => {
                self.cache.save(data)?;
                self.states.save(&self.key, StreamState::settled());
            }
            Some(MergeDirection::Append) => {
                let appending = self.merge_update(data, MergeDirection::Append)?;
                self.states.save(
                    &self.key,
                    StreamState::Settled {
                        appending,
                        prepending: EdgeState::Settled,
                    },
                );
            }
            Some(MergeDirection::Prepend) => {
                let prepending = self.merge_update(data, MergeDirection::Prepend)?;
                self.states.save(
                    &self.key,
                    StreamState::Settled {
                        appending: EdgeState::Settled,
                        prepending,
                    },
                );
            }
        }
        Ok(())
    }

    /// Clears the cached payload and resets the state to settled.
    ///
    /// State is never dropped automatically; this is the explicit way
    /// to discard a stream.
    pub fn invalidate(&self) -> StoreResult<()> {
        let _guard = self.lock.lock();
        self.cache.save(None)?;
        self.states.save(&self.key, StreamState::settled());
        Ok(())
    }

    /// Merges a directional update and returns the resulting edge state.
    fn merge_update(
        &self,
        data: Option<T>,
        direction: MergeDirection,
    ) -> StoreResult<EdgeState> {
        match data {
            Some(new) => {
                let cached = self.cache.load()?;
                match direction {
                    MergeDirection::Append => self.cache.save_appending(cached, new)?,
                    MergeDirection::Prepend => self.cache.save_prepending(cached, new)?,
                }
                Ok(EdgeState::Settled)
            }
            // Absent payload: the caller asserts this edge has no more data
            None => Ok(EdgeState::Exhausted),
        }
    }

    fn request(&self, request_type: RequestType, options: FetchOptions) -> StoreResult<()> {
        let cached = {
            let _guard = self.lock.lock();
            match self.decide(request_type, &options)? {
                Decision::Skip => return Ok(()),
                Decision::Fetch(cached) => cached,
            }
        };

        if options.await_fetching {
            self.execute_fetch(cached, options.clear_cache_when_fetch_fails, request_type)
        } else {
            let selector = self.clone();
            let clear_on_fail = options.clear_cache_when_fetch_fails;
            self.supervisor.spawn(move || {
                if let Err(error) = selector.execute_fetch(cached, clear_on_fail, request_type) {
                    error!(%error, "detached fetch could not publish its outcome");
                }
            });
            Ok(())
        }
    }

    /// The fetch-decision policy, evaluated under the key lock.
    ///
    /// When a fetch is warranted, the in-flight state is persisted here
    /// before returning; that write is the duplicate-suppression barrier
    /// a concurrent request will observe.
    fn decide(
        &self,
        request_type: RequestType,
        options: &FetchOptions,
    ) -> StoreResult<Decision<T>> {
        let state = self.states.load(&self.key);
        let axis_allows = match &state {
            StreamState::Settled {
                appending,
                prepending,
            } => match request_type {
                // Refresh is independent of the pagination edges
                RequestType::Refresh => true,
                RequestType::Append => Self::edge_allows(appending, options),
                RequestType::Prepend => Self::edge_allows(prepending, options),
            },
            StreamState::Loading => false,
            StreamState::Error(_) => options.continue_when_error,
        };
        if !axis_allows {
            debug!(?request_type, ?state, "fetch suppressed");
            return Ok(Decision::Skip);
        }

        let cached = self.cache.load()?;
        let should_fetch = match (&cached, request_type) {
            (None, _) => true,
            _ if options.force_refresh => true,
            (Some(data), RequestType::Refresh) => (self.need_refresh)(data),
            // Pagination always fetches once its edge allows it; the
            // staleness predicate applies to refresh only.
            (Some(_), _) => true,
        };
        if !should_fetch {
            debug!(?request_type, "cache is fresh, serving as-is");
            return Ok(Decision::Skip);
        }

        self.mark_in_flight(request_type, options)?;
        debug!(?request_type, awaited = options.await_fetching, "fetch launched");
        Ok(Decision::Fetch(cached))
    }

    fn edge_allows(edge: &EdgeState, options: &FetchOptions) -> bool {
        match edge {
            EdgeState::Settled => true,
            EdgeState::Exhausted | EdgeState::Loading => false,
            EdgeState::Error(_) => options.continue_when_error,
        }
    }

    /// Persists the in-flight state (and the optional pre-fetch cache
    /// clear), preserving the untouched edge as currently stored.
    fn mark_in_flight(&self, request_type: RequestType, options: &FetchOptions) -> StoreResult<()> {
        if options.clear_cache_before_fetching {
            self.cache.save(None)?;
        }
        let state = self.states.load(&self.key);
        let in_flight = match request_type {
            RequestType::Refresh => StreamState::Loading,
            RequestType::Append => StreamState::Settled {
                appending: EdgeState::Loading,
                prepending: state.prepending(),
            },
            RequestType::Prepend => StreamState::Settled {
                appending: state.appending(),
                prepending: EdgeState::Loading,
            },
        };
        self.states.save(&self.key, in_flight);
        Ok(())
    }

    /// Runs the origin call and publishes its outcome.
    ///
    /// Runs unlocked on either the calling thread (awaited) or a
    /// supervisor thread (detached); publication re-acquires the key
    /// lock.
    fn execute_fetch(
        &self,
        cached: Option<T>,
        clear_cache_when_fetch_fails: bool,
        request_type: RequestType,
    ) -> StoreResult<()> {
        let outcome = match request_type {
            RequestType::Refresh => self.origin.fetch(),
            RequestType::Append => self.origin.fetch_appending(cached.as_ref()),
            RequestType::Prepend => self.origin.fetch_prepending(cached.as_ref()),
        };
        match outcome {
            Ok(fetched) => self.publish_success(cached, fetched, request_type),
            Err(cause) => {
                self.publish_failure(cause, clear_cache_when_fetch_fails, request_type)
            }
        }
    }

    fn publish_success(
        &self,
        cached: Option<T>,
        fetched: FetchResult<T>,
        request_type: RequestType,
    ) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let FetchResult {
            data,
            no_more_appending,
            no_more_prepending,
        } = fetched;

        match request_type {
            RequestType::Refresh => self.cache.save(Some(data))?,
            RequestType::Append => self.cache.save_appending(cached, data)?,
            RequestType::Prepend => self.cache.save_prepending(cached, data)?,
        }

        // The untouched edge may have moved while the fetch ran; read it
        // from the store now, not from a pre-fetch copy.
        let state = self.states.load(&self.key);
        let settled = match request_type {
            RequestType::Refresh => StreamState::Settled {
                appending: Self::edge_after(no_more_appending),
                prepending: Self::edge_after(no_more_prepending),
            },
            RequestType::Append => StreamState::Settled {
                appending: Self::edge_after(no_more_appending),
                prepending: state.prepending(),
            },
            RequestType::Prepend => StreamState::Settled {
                appending: state.appending(),
                prepending: Self::edge_after(no_more_prepending),
            },
        };
        self.states.save(&self.key, settled);
        Ok(())
    }

    fn publish_failure(
        &self,
        cause: FetchError,
        clear_cache_when_fetch_fails: bool,
        request_type: RequestType,
    ) -> StoreResult<()> {
        let _guard = self.lock.lock();
        if clear_cache_when_fetch_fails {
            self.cache.save(None)?;
        }
        let state = self.states.load(&self.key);
        let failed = match request_type {
            RequestType::Refresh => StreamState::Error(cause),
            RequestType::Append => StreamState::Settled {
                appending: EdgeState::Error(cause),
                prepending: state.prepending(),
            },
            RequestType::Prepend => StreamState::Settled {
                appending: state.appending(),
                prepending: EdgeState::Error(cause),
            },
        };
        self.states.save(&self.key, failed);
        Ok(())
    }

    fn edge_after(exhausted: bool) -> EdgeState {
        if exhausted {
            EdgeState::Exhausted
        } else {
            EdgeState::Settled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryListCache;
    use crate::origin::MockOrigin;
    use streamstore_state::MemoryStateStore;

    type Store = MemoryStateStore<String, StreamState>;
    type Selector =
        DataSelector<String, Vec<u32>, Store, MemoryListCache<u32>, MockOrigin<Vec<u32>>>;

    fn make_selector(need_refresh: bool) -> (Selector, Arc<Store>, Arc<MockOrigin<Vec<u32>>>) {
        let states = Arc::new(MemoryStateStore::new());
        let origin = MockOrigin::new();
        let selector = DataSelector::new(
            "orgs".to_string(),
            Arc::clone(&states),
            MemoryListCache::new(),
            origin,
            move |_: &Vec<u32>| need_refresh,
        );
        let origin = Arc::clone(&selector.origin);
        (selector, states, origin)
    }

    #[test]
    fn load_is_passive() {
        let (selector, _, origin) = make_selector(false);
        assert_eq!(selector.load().unwrap(), None);
        assert_eq!(origin.fetch_calls(), 0);
        assert_eq!(selector.state(), StreamState::settled());
    }

    #[test]
    fn refresh_with_empty_cache_fetches_and_settles() {
        let (selector, _, origin) = make_selector(false);
        origin.push_fetch(Ok(FetchResult::new(vec![1, 2, 3])));

        selector.refresh(FetchOptions::default()).unwrap();

        assert_eq!(origin.fetch_calls(), 1);
        assert_eq!(selector.load().unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(selector.state(), StreamState::settled());
    }

    #[test]
    fn fresh_cache_suppresses_refresh() {
        let (selector, _, origin) = make_selector(false);
        selector.update(Some(vec![1]), None).unwrap();

        selector.refresh(FetchOptions::default()).unwrap();
        assert_eq!(origin.fetch_calls(), 0);

        // force_refresh overrides the staleness gate
        origin.push_fetch(Ok(FetchResult::new(vec![2])));
        selector
            .refresh(FetchOptions::default().with_force_refresh(true))
            .unwrap();
        assert_eq!(origin.fetch_calls(), 1);
        assert_eq!(selector.load().unwrap(), Some(vec![2]));
    }

    #[test]
    fn stale_cache_triggers_refresh() {
        let (selector, _, origin) = make_selector(true);
        selector.update(Some(vec![1]), None).unwrap();
        origin.push_fetch(Ok(FetchResult::new(vec![9])));

        selector.refresh(FetchOptions::default()).unwrap();
        assert_eq!(origin.fetch_calls(), 1);
        assert_eq!(selector.load().unwrap(), Some(vec![9]));
    }

    #[test]
    fn loading_state_suppresses_duplicate_refresh() {
        let (selector, states, origin) = make_selector(true);
        states.save(&"orgs".to_string(), StreamState::Loading);

        selector.refresh(FetchOptions::default()).unwrap();
        assert_eq!(origin.fetch_calls(), 0);
        assert_eq!(selector.state(), StreamState::Loading);
    }

    #[test]
    fn error_state_gates_on_continue_when_error() {
        let (selector, states, origin) = make_selector(true);
        states.save(
            &"orgs".to_string(),
            StreamState::Error(FetchError::new("boom")),
        );

        selector.refresh(FetchOptions::default()).unwrap();
        assert_eq!(origin.fetch_calls(), 0);

        origin.push_fetch(Ok(FetchResult::new(vec![1])));
        selector
            .refresh(FetchOptions::default().with_continue_when_error(true))
            .unwrap();
        assert_eq!(origin.fetch_calls(), 1);
        assert_eq!(selector.state(), StreamState::settled());
    }

    #[test]
    fn append_on_exhausted_edge_is_a_no_op() {
        let (selector, states, origin) = make_selector(false);
        states.save(
            &"orgs".to_string(),
            StreamState::Settled {
                appending: EdgeState::Exhausted,
                prepending: EdgeState::Settled,
            },
        );

        selector.request_append(FetchOptions::default()).unwrap();
        assert_eq!(origin.append_calls(), 0);
    }

    #[test]
    fn append_failure_marks_only_the_append_edge() {
        let (selector, states, origin) = make_selector(false);
        states.save(
            &"orgs".to_string(),
            StreamState::Settled {
                appending: EdgeState::Settled,
                prepending: EdgeState::Exhausted,
            },
        );
        selector.update(Some(vec![1]), None).unwrap();
        states.save(
            &"orgs".to_string(),
            StreamState::Settled {
                appending: EdgeState::Settled,
                prepending: EdgeState::Exhausted,
            },
        );
        origin.push_append(Err(FetchError::new("network down")));

        selector.request_append(FetchOptions::default()).unwrap();

        assert_eq!(
            selector.state(),
            StreamState::Settled {
                appending: EdgeState::Error(FetchError::new("network down")),
                prepending: EdgeState::Exhausted,
            }
        );
        // Payload preserved: clear_cache_when_fetch_fails was off
        assert_eq!(selector.load().unwrap(), Some(vec![1]));
    }

    #[test]
    fn prepend_failure_marks_only_the_prepend_edge() {
        let (selector, states, origin) = make_selector(false);
        selector.update(Some(vec![5]), None).unwrap();
        states.save(
            &"orgs".to_string(),
            StreamState::Settled {
                appending: EdgeState::Exhausted,
                prepending: EdgeState::Settled,
            },
        );
        origin.push_prepend(Err(FetchError::new("network down")));

        selector.request_prepend(FetchOptions::default()).unwrap();

        assert_eq!(
            selector.state(),
            StreamState::Settled {
                appending: EdgeState::Exhausted,
                prepending: EdgeState::Error(FetchError::new("network down")),
            }
        );
        assert_eq!(selector.load().unwrap(), Some(vec![5]));
    }

    #[test]
    fn clear_cache_before_fetching_discards_payload_even_on_failure() {
        let (selector, _, origin) = make_selector(true);
        selector.update(Some(vec![1]), None).unwrap();
        origin.push_fetch(Err(FetchError::new("boom")));

        selector
            .refresh(FetchOptions::default().with_clear_cache_before_fetching(true))
            .unwrap();

        assert_eq!(selector.load().unwrap(), None);
        assert_eq!(
            selector.state(),
            StreamState::Error(FetchError::new("boom"))
        );
    }

    #[test]
    fn failed_refresh_clears_cache_when_asked() {
        let (selector, _, origin) = make_selector(true);
        selector.update(Some(vec![1]), None).unwrap();
        origin.push_fetch(Err(FetchError::new("boom")));

        selector
            .refresh(FetchOptions::default().with_clear_cache_when_fetch_fails(true))
            .unwrap();

        assert_eq!(selector.load().unwrap(), None);
        assert_eq!(
            selector.state(),
            StreamState::Error(FetchError::new("boom"))
        );
    }

    #[test]
    fn update_resets_state_from_error() {
        let (selector, states, _) = make_selector(false);
        states.save(
            &"orgs".to_string(),
            StreamState::Error(FetchError::new("boom")),
        );

        selector.update(Some(vec![5]), None).unwrap();

        assert_eq!(selector.state(), StreamState::settled());
        assert_eq!(selector.load().unwrap(), Some(vec![5]));
    }

    #[test]
    fn directional_update_merges_and_marks_exhaustion() {
        let (selector, _, _) = make_selector(false);
        selector.update(Some(vec![1, 2]), None).unwrap();

        selector
            .update(Some(vec![3]), Some(MergeDirection::Append))
            .unwrap();
        assert_eq!(selector.load().unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(selector.state(), StreamState::settled());

        // Absent payload asserts "no more data" on that edge
        selector.update(None, Some(MergeDirection::Append)).unwrap();
        assert_eq!(
            selector.state(),
            StreamState::Settled {
                appending: EdgeState::Exhausted,
                prepending: EdgeState::Settled,
            }
        );
        assert_eq!(selector.load().unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn invalidate_clears_payload_and_state() {
        let (selector, states, _) = make_selector(false);
        selector.update(Some(vec![1]), None).unwrap();
        states.save(&"orgs".to_string(), StreamState::Loading);

        selector.invalidate().unwrap();

        assert_eq!(selector.load().unwrap(), None);
        assert_eq!(selector.state(), StreamState::settled());
    }

    #[test]
    fn detached_fetch_completes_through_supervisor() {
        let (selector, _, origin) = make_selector(false);
        origin.push_append(Ok(FetchResult::new(vec![1, 2])));

        selector
            .request_append(FetchOptions::default().with_await_fetching(false))
            .unwrap();
        selector.supervisor().wait_idle();

        assert_eq!(selector.load().unwrap(), Some(vec![1, 2]));
        assert_eq!(selector.state(), StreamState::settled());
    }

    #[test]
    fn snapshot_pairs_payload_and_state() {
        let (selector, _, origin) = make_selector(false);
        origin.push_fetch(Ok(FetchResult::new(vec![4]).with_no_more_appending(true)));
        selector.refresh(FetchOptions::default()).unwrap();

        let snapshot = selector.snapshot().unwrap();
        assert_eq!(snapshot.payload, Some(vec![4]));
        assert_eq!(
            snapshot.state,
            StreamState::Settled {
                appending: EdgeState::Exhausted,
                prepending: EdgeState::Settled,
            }
        );
    }
}
