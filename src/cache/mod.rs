use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Key-value cache with TTL support and prefix (wildcard) invalidation.
///
/// Cache failures are never surfaced to callers; a broken cache degrades to
/// misses, not errors.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }
    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) {}
    async fn del(&self, _key: &str) {}
    async fn del_prefix(&self, _prefix: &str) {}
}

/// Caches nothing; every read is a miss.
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {}
