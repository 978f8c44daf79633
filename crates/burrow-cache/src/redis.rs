use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::{CacheError, CacheKey, CachedResponse, ResponseCache, Result, DEFAULT_TTL};

/// Prefix of every key written by [`RedisResponseCache`].
pub const DEFAULT_KEY_PREFIX: &str = "burrow:resp:";

/// A Redis-backed [`ResponseCache`].
///
/// Responses are stored as JSON strings under a configurable key prefix and
/// written with `SET .. EX` so they expire after the configured TTL.
#[derive(Debug, Clone)]
pub struct RedisResponseCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
    ttl: Duration,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_connection_refusal() || err.is_connection_dropped() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisResponseCache {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| map_redis_error("invalid Redis URL", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    /// Uses a custom prefix for cache keys (e.g. `"myapp:resp:"`).
    pub fn with_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Overrides the expiry of written entries. Sub-second parts are
    /// truncated; zero is rounded up to one second.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.key_prefix, key.as_str())
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResponse>> {
        let redis_key = self.redis_key(key);
        trace!(key = %key, "Fetching response from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&redis_key).await {
            Ok(Some(cached)) => {
                debug!(key = %key, "Cache hit in Redis");
                match serde_json::from_str::<CachedResponse>(&cached) {
                    Ok(response) => Ok(Some(response)),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to deserialize cached response");
                        Err(CacheError::InvalidData(format!(
                            "invalid cached value for key '{key}': {e}"
                        )))
                    }
                }
            }
            Ok(None) => {
                trace!(key = %key, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn put(&self, key: &CacheKey, response: &CachedResponse) -> Result<()> {
        let redis_key = self.redis_key(key);
        trace!(key = %key, "Storing response in Redis cache");

        let json = serde_json::to_string(response).map_err(|e| {
            CacheError::Serialization(format!("failed to serialize cache value: {e}"))
        })?;

        let mut conn = self.conn.clone();
        match conn
            .set_ex::<_, _, ()>(&redis_key, json, self.ttl_secs())
            .await
        {
            Ok(()) => {
                debug!(key = %key, status = response.status, "Cached response in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache response in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }
}
