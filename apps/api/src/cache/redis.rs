use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::warn;

use crate::cache::{cache_ttl, CacheEntry, CacheKey, ResponseCache};
use crate::clock::Clock;
use crate::models::job::CanonicalJob;

/// Shared cache for multi-instance deployments. Redis expires keys on its
/// own; the embedded timestamp is still checked so a skewed server TTL can
/// never serve an entry past six hours.
pub struct RedisResponseCache {
    client: redis::Client,
    clock: Arc<dyn Clock>,
}

impl RedisResponseCache {
    pub fn new(client: redis::Client, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    async fn fetch(&self, key: &CacheKey) -> redis::RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key.storage_key()).await
    }

    async fn store(&self, key: &CacheKey, payload: String) -> redis::RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let ttl_secs = cache_ttl().num_seconds().max(1) as u64;
        conn.set_ex(key.storage_key(), payload, ttl_secs).await
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get(&self, key: &CacheKey) -> Option<Vec<CanonicalJob>> {
        let raw = match self.fetch(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Redis cache read failed for {}: {e}", key.storage_key());
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {e}", key.storage_key());
                return None;
            }
        };

        entry.is_fresh(self.clock.now()).then_some(entry.jobs)
    }

    async fn put(&self, key: &CacheKey, jobs: Vec<CanonicalJob>) {
        let entry = CacheEntry {
            created_at: self.clock.now(),
            jobs,
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not encode cache entry {}: {e}", key.storage_key());
                return;
            }
        };
        if let Err(e) = self.store(key, payload).await {
            warn!("Redis cache write failed for {}: {e}", key.storage_key());
        }
    }
}
