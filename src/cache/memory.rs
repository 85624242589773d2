use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::Cache;

/// In-process cache used in tests and when no CACHE_URL is configured.
/// Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let expired = match self.entries.get(key) {
            Some(e) => match e.expires_at {
                Some(deadline) if Instant::now() >= deadline => true,
                _ => return Some(e.value.clone()),
            },
            None => return None,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
    }

    async fn del(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn del_prefix(&self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }
}
