//! Response cache trait and implementations used by the Burrow gateway.

pub mod cache;
pub mod error;
pub mod key;
pub mod layered;
pub mod moka;
pub mod redis;
pub mod response;

pub use cache::{ResponseCache, DEFAULT_TTL};
pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use layered::LayeredCache;
pub use moka::{MokaCacheConfig, MokaResponseCache};
pub use redis::{RedisResponseCache, DEFAULT_KEY_PREFIX};
pub use response::CachedResponse;
