//! Error types for the Tally engine.

use thiserror::Error;

/// All possible errors from the Tally engine.
///
/// Remote failures are constructed by the I/O layer and fed into the
/// session's `complete_*` methods; the session converts them into degraded
/// state rather than surfacing them to observers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Remote failure taxonomy
    #[error("not found: {0}")]
    NotFound(String),

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    // Cache entry errors
    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    #[error("cache format version mismatch: expected {expected}, got {actual}")]
    CacheVersionMismatch { expected: u32, actual: u32 },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
