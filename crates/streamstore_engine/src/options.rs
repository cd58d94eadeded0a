//! Request axes and fetch policy flags.

/// The axis a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// Replace the whole payload from the origin.
    Refresh,
    /// Fetch the next page and merge at the tail.
    Append,
    /// Fetch the previous page and merge at the head.
    Prepend,
}

/// Direction of an externally-sourced merge in `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    /// Merge at the tail.
    Append,
    /// Merge at the head.
    Prepend,
}

/// Policy flags for a single request.
///
/// Each flag is individually simple; the engine reconciles their
/// combinations against the current lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch even when the cache is present and not stale.
    pub force_refresh: bool,
    /// Clear the cached payload before the fetch starts; observers
    /// briefly see no data plus a loading state.
    pub clear_cache_before_fetching: bool,
    /// Clear the cached payload if the fetch fails.
    pub clear_cache_when_fetch_fails: bool,
    /// Attempt a fetch even when the last one on this axis failed.
    pub continue_when_error: bool,
    /// Run the fetch synchronously as part of the request. When false
    /// the fetch is detached: the call returns once the in-flight state
    /// is persisted and completion is observable only through the feed.
    pub await_fetching: bool,
}

impl FetchOptions {
    /// Creates the default options: await the fetch, all other flags off.
    pub fn new() -> Self {
        Self {
            force_refresh: false,
            clear_cache_before_fetching: false,
            clear_cache_when_fetch_fails: false,
            continue_when_error: false,
            await_fetching: true,
        }
    }

    /// Sets `force_refresh`.
    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Sets `clear_cache_before_fetching`.
    pub fn with_clear_cache_before_fetching(mut self, clear: bool) -> Self {
        self.clear_cache_before_fetching = clear;
        self
    }

    /// Sets `clear_cache_when_fetch_fails`.
    pub fn with_clear_cache_when_fetch_fails(mut self, clear: bool) -> Self {
        self.clear_cache_when_fetch_fails = clear;
        self
    }

    /// Sets `continue_when_error`.
    pub fn with_continue_when_error(mut self, continue_on: bool) -> Self {
        self.continue_when_error = continue_on;
        self
    }

    /// Sets `await_fetching`.
    pub fn with_await_fetching(mut self, await_fetching: bool) -> Self {
        self.await_fetching = await_fetching;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new()
    }
}
