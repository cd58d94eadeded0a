//! # Streamstore Engine
//!
//! Fetch-orchestration state machine over cache and origin ports.
//!
//! This crate provides:
//! - `CacheStore` / `OriginStore` ports (caller-supplied, per key)
//! - `FetchOptions` policy flags and the three request axes
//! - `DataSelector`, the per-key decision and transition engine
//! - `FetchSupervisor` for detached (fire-and-forget) fetches
//! - A simplified single-axis paging variant
//!
//! ## Architecture
//!
//! The engine mediates between a slow or unreliable origin and a local
//! cache, exposing a consistent observable state per key. On every
//! request it reads the current state, decides whether to serve the
//! cache, launch a fetch, suppress a duplicate, or surface an existing
//! error, and persists each transition before control moves on.
//!
//! ## Key Invariants
//!
//! - The in-flight state is persisted before the origin is called, so a
//!   concurrent request never launches a duplicate fetch
//! - The untouched pagination edge is re-read from the store immediately
//!   before the final write, never carried from a stale copy
//! - Origin failures become observable state, not errors on the
//!   triggering call; cache I/O failures propagate to the caller
//! - No automatic retry: a failed axis stays failed until an explicit
//!   continuation or refresh

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod locks;
mod options;
mod origin;
pub mod paging;
mod selector;
mod supervisor;

pub use cache::{CacheStore, MemoryListCache};
pub use error::{StoreError, StoreResult};
pub use locks::KeyLocks;
pub use options::{FetchOptions, MergeDirection, RequestType};
pub use origin::{FetchResult, MockOrigin, OriginStore};
pub use selector::{DataSelector, Snapshot};
pub use supervisor::FetchSupervisor;
