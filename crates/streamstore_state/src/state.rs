//! Lifecycle state tagged unions.
//!
//! One `StreamState` exists per key. The refresh axis is the top-level
//! variant; the append and prepend edges are tracked independently inside
//! `Settled` so a pagination fetch on one edge never disturbs the other.

use thiserror::Error;

/// Recorded cause of a failed origin fetch.
///
/// Stored inside error states, so it must stay cheap to clone and
/// comparable for exhaustive matching. The origin's concrete error is
/// captured as its display message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch failed: {message}")]
pub struct FetchError {
    message: String,
}

impl FetchError {
    /// Creates a fetch error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Captures an arbitrary error as a fetch error.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: error.to_string(),
        }
    }

    /// Returns the recorded message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// State of one pagination edge (append or prepend).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EdgeState {
    /// No fetch in flight; more data may exist on this edge.
    #[default]
    Settled,
    /// This edge has no further data. Permanent until the next
    /// successful refresh resets it.
    Exhausted,
    /// A fetch for this edge is in flight.
    Loading,
    /// The last fetch for this edge failed.
    Error(FetchError),
}

impl EdgeState {
    /// Returns true if a fetch for this edge is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, EdgeState::Loading)
    }

    /// Returns true if this edge is exhausted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, EdgeState::Exhausted)
    }
}

/// Lifecycle state of one logical data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// Data is settled; edges track the pagination boundaries
    /// independently.
    Settled {
        /// State of the append edge.
        appending: EdgeState,
        /// State of the prepend edge.
        prepending: EdgeState,
    },
    /// A refresh fetch is in flight. Pagination is meaningless
    /// mid-refresh, so no edge states apply.
    Loading,
    /// The last refresh fetch failed.
    Error(FetchError),
}

impl StreamState {
    /// The state of a stream never touched before: settled on all axes.
    pub fn settled() -> Self {
        StreamState::Settled {
            appending: EdgeState::Settled,
            prepending: EdgeState::Settled,
        }
    }

    /// Returns true if a refresh fetch is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, StreamState::Loading)
    }

    /// Current append edge, or `Settled` when no edges apply.
    ///
    /// Used to carry the untouched axis through a transition on the
    /// other one.
    pub fn appending(&self) -> EdgeState {
        match self {
            StreamState::Settled { appending, .. } => appending.clone(),
            _ => EdgeState::Settled,
        }
    }

    /// Current prepend edge, or `Settled` when no edges apply.
    pub fn prepending(&self) -> EdgeState {
        match self {
            StreamState::Settled { prepending, .. } => prepending.clone(),
            _ => EdgeState::Settled,
        }
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::settled()
    }
}

/// Lifecycle state for the simplified single-axis (append-only) variant.
///
/// Collapses the two edges of [`StreamState`] into one `reached_last`
/// flag on the settled variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingState {
    /// Data is settled.
    Settled {
        /// True once a fetch returned an empty page; further additional
        /// requests are no-ops until a refresh.
        reached_last: bool,
    },
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed.
    Error(FetchError),
}

impl PagingState {
    /// Returns true if the list is known to be complete.
    pub fn reached_last(&self) -> bool {
        matches!(self, PagingState::Settled { reached_last: true })
    }
}

impl Default for PagingState {
    fn default() -> Self {
        PagingState::Settled {
            reached_last: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_fully_settled() {
        let state = StreamState::default();
        assert_eq!(state, StreamState::settled());
        assert_eq!(state.appending(), EdgeState::Settled);
        assert_eq!(state.prepending(), EdgeState::Settled);
        assert!(!state.is_loading());
    }

    #[test]
    fn edges_default_to_settled_outside_settled_state() {
        assert_eq!(StreamState::Loading.appending(), EdgeState::Settled);
        let errored = StreamState::Error(FetchError::new("boom"));
        assert_eq!(errored.prepending(), EdgeState::Settled);
    }

    #[test]
    fn edge_accessors_preserve_per_edge_values() {
        let state = StreamState::Settled {
            appending: EdgeState::Exhausted,
            prepending: EdgeState::Loading,
        };
        assert!(state.appending().is_exhausted());
        assert!(state.prepending().is_loading());
    }

    #[test]
    fn fetch_error_from_std_error() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let error = FetchError::from_error(&io);
        assert_eq!(error.message(), "socket timed out");
        assert!(error.to_string().contains("fetch failed"));
    }

    #[test]
    fn paging_state_defaults() {
        let state = PagingState::default();
        assert_eq!(
            state,
            PagingState::Settled {
                reached_last: false
            }
        );
        assert!(!state.reached_last());
        assert!(PagingState::Settled { reached_last: true }.reached_last());
    }
}
