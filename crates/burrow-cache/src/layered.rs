use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{CacheKey, CachedResponse, ResponseCache, Result};

/// A two-level cache composing a fast local L1 with a shared L2.
///
/// - **Get**: try L1, then L2. An L2 hit is backfilled into L1.
/// - **Put**: write to L2 first, then L1.
///
/// # Example
///
/// ```rust
/// use burrow_cache::{LayeredCache, MokaResponseCache};
///
/// let l1 = MokaResponseCache::with_capacity(10_000);
/// // let l2 = RedisResponseCache::connect("redis://127.0.0.1/").await?;
/// let l2 = MokaResponseCache::with_capacity(100_000);
/// let cache = LayeredCache::new(l1, l2);
/// # let _ = cache;
/// ```
#[derive(Debug, Clone)]
pub struct LayeredCache<L1, L2> {
    l1: L1,
    l2: L2,
}

impl<L1, L2> LayeredCache<L1, L2> {
    pub fn new(l1: L1, l2: L2) -> Self {
        Self { l1, l2 }
    }

    pub fn l1(&self) -> &L1 {
        &self.l1
    }

    pub fn l2(&self) -> &L2 {
        &self.l2
    }
}

#[async_trait]
impl<L1, L2> ResponseCache for LayeredCache<L1, L2>
where
    L1: ResponseCache,
    L2: ResponseCache,
{
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        if let Some(response) = self.l1.get(key).await? {
            debug!(key = %key, "L1 cache hit");
            return Ok(Some(response));
        }
        trace!(key = %key, "L1 cache miss, trying L2");

        match self.l2.get(key).await? {
            Some(response) => {
                debug!(key = %key, "L2 cache hit, backfilling L1");
                self.l1.put(key, &response).await?;
                Ok(Some(response))
            }
            None => {
                trace!(key = %key, "L2 cache miss");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, response: &CachedResponse) -> Result<()> {
        self.l2.put(key, response).await?;
        self.l1.put(key, response).await?;
        debug!(key = %key, "Stored in L1 and L2 caches");
        Ok(())
    }
}
