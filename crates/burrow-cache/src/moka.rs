use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::{CacheKey, CachedResponse, ResponseCache, Result, DEFAULT_TTL};

const DEFAULT_CAPACITY: u64 = 10_000;

/// An in-memory [`ResponseCache`] backed by Moka.
///
/// Suitable for single-node deployments or as the L1 in front of Redis.
#[derive(Debug, Clone)]
pub struct MokaResponseCache {
    cache: Cache<CacheKey, CachedResponse>,
}

impl MokaResponseCache {
    /// Creates a cache holding up to 10,000 responses for one year each.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a cache with a custom maximum number of entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        MokaCacheConfig::builder()
            .max_capacity(max_capacity)
            .build()
            .into()
    }

    /// Returns a builder for a custom cache configuration.
    pub fn builder() -> MokaCacheConfigBuilder {
        MokaCacheConfig::builder()
    }
}

impl Default for MokaResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for MokaResponseCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        trace!(key = %key, "Fetching response from Moka cache");

        match self.cache.get(key).await {
            Some(response) => {
                debug!(key = %key, "Cache hit in Moka");
                Ok(Some(response))
            }
            None => {
                trace!(key = %key, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, response: &CachedResponse) -> Result<()> {
        self.cache.insert(key.clone(), response.clone()).await;
        debug!(key = %key, status = response.status, "Cached response in Moka");
        Ok(())
    }
}

/// Configuration for a [`MokaResponseCache`].
#[derive(Debug, TypedBuilder)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = DEFAULT_CAPACITY)]
    max_capacity: u64,
    /// Time-to-live of every entry.
    #[builder(default = DEFAULT_TTL)]
    ttl: Duration,
}

impl From<MokaCacheConfig> for MokaResponseCache {
    fn from(config: MokaCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();
        MokaResponseCache { cache }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn key(path: &str) -> CacheKey {
        CacheKey::new("paste.example", path, [])
    }

    fn response(body: &'static str) -> CachedResponse {
        CachedResponse::new(200, vec![], Bytes::from_static(body.as_bytes()))
    }

    #[tokio::test]
    async fn cache_get_and_put() {
        let cache = MokaResponseCache::new();
        let k = key("/abc");

        assert!(cache.get(&k).await.unwrap().is_none());

        cache.put(&k, &response("hello")).await.unwrap();

        assert_eq!(cache.get(&k).await.unwrap(), Some(response("hello")));
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let cache = MokaResponseCache::new();
        let k = key("/abc");

        cache.put(&k, &response("first")).await.unwrap();
        cache.put(&k, &response("second")).await.unwrap();

        assert_eq!(cache.get(&k).await.unwrap(), Some(response("second")));
    }

    #[tokio::test]
    async fn negative_entries_are_cached_too() {
        let cache = MokaResponseCache::new();
        let k = key("/missing");
        let not_found = CachedResponse::new(404, vec![], Bytes::new());

        cache.put(&k, &not_found).await.unwrap();

        assert_eq!(cache.get(&k).await.unwrap(), Some(not_found));
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: MokaResponseCache = MokaResponseCache::builder()
            .max_capacity(100)
            .ttl(Duration::from_millis(50))
            .build()
            .into();
        let k = key("/abc");

        cache.put(&k, &response("hello")).await.unwrap();
        assert!(cache.get(&k).await.unwrap().is_some());

        awaitility::at_most(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(20))
            .until_async(|| async { cache.get(&k).await.unwrap().is_none() })
            .await;
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let cache = MokaResponseCache::with_capacity(100);

        for i in 0..50 {
            let body = Bytes::from(format!("body{i}"));
            let entry = CachedResponse::new(200, vec![], body);
            cache.put(&key(&format!("/k{i}")), &entry).await.unwrap();
        }

        let hit = cache.get(&key("/k25")).await.unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from("body25"));
    }
}
