//! Error types for the engine.
//!
//! Origin fetch failures are deliberately absent here: they are recorded
//! as lifecycle state (`StreamState::Error` / `EdgeState::Error`) and
//! surfaced through observation, never raised by the triggering call.
//! Only cache I/O failures propagate synchronously — a broken cache is
//! not a recoverable stream condition.

use thiserror::Error;

/// Result type for engine operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur on the cache side of an engine operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Cache load or save failed.
    #[error("cache error: {message}")]
    Cache {
        /// Error message.
        message: String,
    },

    /// I/O error from a disk-backed cache implementation.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Creates a cache error from a message.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::cache("row missing");
        assert_eq!(err.to_string(), "cache error: row missing");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = StoreError::from(io);
        assert!(err.to_string().contains("no such file"));
    }
}
