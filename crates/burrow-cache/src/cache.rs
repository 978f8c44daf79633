use async_trait::async_trait;
use std::time::Duration;

use crate::{CacheKey, CachedResponse, Result};

/// Lifetime of every cached response: one year, matching the
/// `Cache-Control: max-age` the gateway advertises.
pub const DEFAULT_TTL: Duration = Duration::from_secs(31_536_000);

/// A cache of fully built HTTP responses.
///
/// Entries are keyed by [`CacheKey`] and never explicitly evicted; backends
/// expire them after [`DEFAULT_TTL`] unless configured otherwise.
#[async_trait]
pub trait ResponseCache: Send + Sync + 'static {
    /// Get a response from the cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>>;

    /// Store a response in the cache.
    async fn put(&self, key: &CacheKey, response: &CachedResponse) -> Result<()>;
}
