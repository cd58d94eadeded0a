//! Origin port.
//!
//! The origin is the remote or otherwise slow source of truth. Each axis
//! has its own fetch call; pagination fetches receive the pre-fetch
//! cache snapshot so the implementation can derive a continuation
//! cursor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use streamstore_state::FetchError;

/// Value returned by an origin fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    /// The fetched payload.
    pub data: T,
    /// True when the append edge is exhausted. Meaningful for refresh
    /// and append fetches.
    pub no_more_appending: bool,
    /// True when the prepend edge is exhausted. Meaningful for refresh
    /// and prepend fetches.
    pub no_more_prepending: bool,
}

impl<T> FetchResult<T> {
    /// Creates a result with both edges still open.
    pub fn new(data: T) -> Self {
        Self {
            data,
            no_more_appending: false,
            no_more_prepending: false,
        }
    }

    /// Sets the append-exhaustion flag.
    pub fn with_no_more_appending(mut self, exhausted: bool) -> Self {
        self.no_more_appending = exhausted;
        self
    }

    /// Sets the prepend-exhaustion flag.
    pub fn with_no_more_prepending(mut self, exhausted: bool) -> Self {
        self.no_more_prepending = exhausted;
        self
    }
}

/// Abstract fetch operations against the origin for one stream.
///
/// Failures are returned as [`FetchError`] and recorded by the engine as
/// observable state; they never escape the triggering call.
pub trait OriginStore<T>: Send + Sync {
    /// Fetches the full payload.
    fn fetch(&self) -> Result<FetchResult<T>, FetchError>;

    /// Fetches the next page, given the pre-fetch cache snapshot.
    fn fetch_appending(&self, cached: Option<&T>) -> Result<FetchResult<T>, FetchError>;

    /// Fetches the previous page, given the pre-fetch cache snapshot.
    fn fetch_prepending(&self, cached: Option<&T>) -> Result<FetchResult<T>, FetchError>;
}

impl<T, O> OriginStore<T> for std::sync::Arc<O>
where
    O: OriginStore<T> + ?Sized,
{
    fn fetch(&self) -> Result<FetchResult<T>, FetchError> {
        (**self).fetch()
    }

    fn fetch_appending(&self, cached: Option<&T>) -> Result<FetchResult<T>, FetchError> {
        (**self).fetch_appending(cached)
    }

    fn fetch_prepending(&self, cached: Option<&T>) -> Result<FetchResult<T>, FetchError> {
        (**self).fetch_prepending(cached)
    }
}

/// A scripted origin for testing.
///
/// Responses are queued per axis and consumed in order; an empty queue
/// yields a fetch error. Call counts are tracked per axis so tests can
/// assert duplicate suppression.
#[derive(Debug, Default)]
pub struct MockOrigin<T> {
    fetch_responses: Mutex<VecDeque<Result<FetchResult<T>, FetchError>>>,
    append_responses: Mutex<VecDeque<Result<FetchResult<T>, FetchError>>>,
    prepend_responses: Mutex<VecDeque<Result<FetchResult<T>, FetchError>>>,
    fetch_calls: AtomicUsize,
    append_calls: AtomicUsize,
    prepend_calls: AtomicUsize,
}

impl<T> MockOrigin<T> {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self {
            fetch_responses: Mutex::new(VecDeque::new()),
            append_responses: Mutex::new(VecDeque::new()),
            prepend_responses: Mutex::new(VecDeque::new()),
            fetch_calls: AtomicUsize::new(0),
            append_calls: AtomicUsize::new(0),
            prepend_calls: AtomicUsize::new(0),
        }
    }

    /// Queues a refresh response.
    pub fn push_fetch(&self, response: Result<FetchResult<T>, FetchError>) {
        self.fetch_responses.lock().unwrap().push_back(response);
    }

    /// Queues an append response.
    pub fn push_append(&self, response: Result<FetchResult<T>, FetchError>) {
        self.append_responses.lock().unwrap().push_back(response);
    }

    /// Queues a prepend response.
    pub fn push_prepend(&self, response: Result<FetchResult<T>, FetchError>) {
        self.prepend_responses.lock().unwrap().push_back(response);
    }

    /// Number of refresh fetches made.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of append fetches made.
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    /// Number of prepend fetches made.
    pub fn prepend_calls(&self) -> usize {
        self.prepend_calls.load(Ordering::SeqCst)
    }

    fn next(
        queue: &Mutex<VecDeque<Result<FetchResult<T>, FetchError>>>,
    ) -> Result<FetchResult<T>, FetchError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::new("no scripted response")))
    }
}

impl<T> OriginStore<T> for MockOrigin<T>
where
    T: Clone + Send + Sync,
{
    fn fetch(&self) -> Result<FetchResult<T>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.fetch_responses)
    }

    fn fetch_appending(&self, _cached: Option<&T>) -> Result<FetchResult<T>, FetchError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.append_responses)
    }

    fn fetch_prepending(&self, _cached: Option<&T>) -> Result<FetchResult<T>, FetchError> {
        self.prepend_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.prepend_responses)
    }
}
