use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use super::Cache;

pub struct RedisCache {
    manager: Arc<ConnectionManager>,
}

impl RedisCache {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        // needs the "connection-manager" feature on redis 0.25
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager: Arc::new(manager),
        })
    }

    fn conn(&self) -> ConnectionManager {
        (*self.manager).clone()
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.conn();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "redis get failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        let mut conn = self.conn();
        let res: redis::RedisResult<()> = match ttl {
            Some(d) => conn.set_ex(key, value, d.as_secs()).await,
            None => conn.set(key, value).await,
        };
        if let Err(e) = res {
            tracing::warn!(key, error = %e, "redis set failed");
        }
    }

    async fn del(&self, key: &str) {
        let mut conn = self.conn();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(key, error = %e, "redis del failed");
        }
    }

    async fn del_prefix(&self, prefix: &str) {
        let mut conn = self.conn();
        let pattern = format!("{prefix}*");
        match conn.keys::<_, Vec<String>>(&pattern).await {
            Ok(keys) if !keys.is_empty() => {
                if let Err(e) = conn.del::<_, ()>(keys).await {
                    tracing::warn!(prefix, error = %e, "redis del_prefix failed");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(prefix, error = %e, "redis keys scan failed"),
        }
    }
}
