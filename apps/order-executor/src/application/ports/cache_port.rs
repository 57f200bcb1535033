//! Cache Store Port (Driven Port)
//!
//! Interface for the distributed cache tier of the state store.

use std::time::Duration;

use async_trait::async_trait;

/// Cache store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The cache could not be reached.
    #[error("Cache unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The cache rejected the operation.
    #[error("Cache operation failed: {message}")]
    OperationFailed {
        /// Error details.
        message: String,
    },
}

/// Port for a key/value cache with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read `key`; `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// List live keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}
