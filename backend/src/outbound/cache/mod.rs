//! Cache adapters for the [`ProgressCache`] port.
//!
//! [`RedisProgressCache`] stores serialised read models in Redis through a
//! `bb8` connection pool. Prefix deletion walks the keyspace with `SCAN` so
//! it never blocks the server the way `KEYS` would.
//!
//! [`NoOpProgressCache`] is wired when no Redis URL is configured. Every read
//! misses and every write succeeds, so callers always fall through to the
//! store.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::{self, AsyncCommands};
use bb8_redis::RedisConnectionManager;

use crate::domain::ports::{CacheKey, ProgressCache, ProgressCacheError};

/// Number of keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 200;

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisProgressCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisProgressCache {
    /// Wrap an existing pool.
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    /// Build a pool for `url` and wrap it.
    pub async fn connect(url: &str, max_size: u32) -> Result<Self, ProgressCacheError> {
        let manager = RedisConnectionManager::new(url)
            .map_err(|err| ProgressCacheError::backend(format!("invalid redis url: {err}")))?;
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .await
            .map_err(|err| ProgressCacheError::backend(err.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn connection(
        &self,
    ) -> Result<bb8_redis::bb8::PooledConnection<'_, RedisConnectionManager>, ProgressCacheError>
    {
        self.pool
            .get()
            .await
            .map_err(|err| ProgressCacheError::backend(format!("redis pool: {err}")))
    }
}

fn backend_error(error: redis::RedisError) -> ProgressCacheError {
    ProgressCacheError::backend(error.to_string())
}

/// `SCAN MATCH` pattern selecting every key that starts with `prefix`.
fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl ProgressCache for RedisProgressCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, ProgressCacheError> {
        let mut conn = self.connection().await?;
        conn.get(key.as_str()).await.map_err(backend_error)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), ProgressCacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key.as_str(), value, seconds)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), ProgressCacheError> {
        let mut conn = self.connection().await?;
        let _removed: u64 = conn.del(key.as_str()).await.map_err(backend_error)?;
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &CacheKey) -> Result<u64, ProgressCacheError> {
        let mut conn = self.connection().await?;
        let pattern = scan_pattern(prefix.as_str());
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .map_err(backend_error)?;
            if !keys.is_empty() {
                let count: u64 = conn.del(&keys).await.map_err(backend_error)?;
                removed += count;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }
}

/// Cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressCache;

#[async_trait]
impl ProgressCache for NoOpProgressCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<String>, ProgressCacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), ProgressCacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<(), ProgressCacheError> {
        Ok(())
    }

    async fn delete_by_prefix(&self, _prefix: &CacheKey) -> Result<u64, ProgressCacheError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("course-stats:rust:", "course-stats:rust:*")]
    #[case("odd*key?", "odd\\*key\\?*")]
    #[case("br[a]ck", "br\\[a\\]ck*")]
    fn scan_pattern_escapes_glob_characters(#[case] prefix: &str, #[case] expected: &str) {
        assert_eq!(scan_pattern(prefix), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn noop_cache_always_misses() {
        let cache = NoOpProgressCache;
        let key = CacheKey::new("learn:rust:1").expect("valid key");

        cache
            .set(&key, "{}", Duration::from_secs(60))
            .await
            .expect("set succeeds");
        assert!(cache.get(&key).await.expect("get succeeds").is_none());
        assert_eq!(
            cache.delete_by_prefix(&key).await.expect("prefix delete"),
            0
        );
    }

    #[rstest]
    #[tokio::test]
    async fn connect_rejects_malformed_urls() {
        let result = RedisProgressCache::connect("not a url", 1).await;
        assert!(matches!(result, Err(ProgressCacheError::Backend { .. })));
    }
}
