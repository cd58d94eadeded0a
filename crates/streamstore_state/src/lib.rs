//! # Streamstore State
//!
//! Per-key lifecycle state model and state persistence for streamstore.
//!
//! This crate provides:
//! - `StreamState` / `EdgeState` tagged unions describing one logical
//!   data stream (refresh axis crossed with append/prepend edges)
//! - `PagingState` for the simplified single-axis variant
//! - `FetchError`, the recorded cause of a failed origin fetch
//! - The `StateStore` trait with an in-memory implementation
//! - A change feed turning state saves into a push feed for observers
//!
//! This is a pure state crate: no fetching, no policy, no cache I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod feed;
mod state;
mod store;

pub use feed::{FeedStateStore, StateEvent, StateFeed};
pub use state::{EdgeState, FetchError, PagingState, StreamState};
pub use store::{MemoryStateStore, StateStore};
