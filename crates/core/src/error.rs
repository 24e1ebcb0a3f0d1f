//! Unified error types for offcache.
//!
//! Every variant carries a stable code prefix so hosts can classify failures
//! without matching on message text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or normalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The request's scheme is not intercepted. A routing signal, not a fault.
    #[error("UNSUPPORTED_SCHEME: {0}")]
    UnsupportedScheme(String),

    /// Offline policy demanded a cached answer but none exists.
    #[error("CACHE_UNAVAILABLE_OFFLINE: {0}")]
    CacheUnavailableOffline(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// The network transport failed.
    #[error("TRANSPORT_FAILURE: {0}")]
    Transport(String),

    /// Database operation failed.
    #[error("STORAGE_FAILURE: {0}")]
    Database(tokio_rusqlite::Error),

    /// Filesystem or serialization failure in a cache store.
    #[error("STORAGE_FAILURE: {0}")]
    Storage(String),

    /// Migration failed to apply.
    #[error("STORAGE_FAILURE: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid cache key format.
    #[error("STORAGE_FAILURE: invalid cache key format")]
    InvalidKey,
}

impl Error {
    /// Whether the failure originated in the cache store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Storage(_) | Error::MigrationFailed(_) | Error::InvalidKey)
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(format!("serialization failed: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::UnsupportedScheme(msg) => (-32004, msg.clone()),
            Error::CacheUnavailableOffline(msg) => (-32005, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Transport(msg) => (-32006, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::Storage(msg) => (-32002, msg.clone()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InvalidKey => (-32002, "Invalid cache key format".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
