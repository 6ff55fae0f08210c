//! Port interface for caching read models.
//!
//! The cache is never authoritative. Callers treat every error as a miss on
//! reads and log and continue on writes and deletes.
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by the caching adapter.
    pub enum ProgressCacheError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "progress cache backend failure: {message}",
        /// Serialisation or deserialisation of cached content failed.
        Serialization { message: String } => "progress cache serialisation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressCache: Send + Sync {
    /// Read a cached payload.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, ProgressCacheError>;

    /// Store a payload with a time to live.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration)
    -> Result<(), ProgressCacheError>;

    /// Delete one key.
    async fn delete(&self, key: &CacheKey) -> Result<(), ProgressCacheError>;

    /// Delete every key starting with `prefix`. Returns how many were removed.
    async fn delete_by_prefix(&self, prefix: &CacheKey) -> Result<u64, ProgressCacheError>;
}
