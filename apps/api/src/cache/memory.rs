use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheEntry, CacheKey, ResponseCache};
use crate::clock::Clock;
use crate::models::job::CanonicalJob;

/// Process-local cache. Reads share the lock; writes are last-writer-wins.
pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl InMemoryResponseCache {
    pub fn new(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            max_entries: max_entries.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &CacheKey) -> Option<Vec<CanonicalJob>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Some(entry.jobs.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: evict lazily. Re-check under the write lock since a fresh
        // put may have landed in between.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| !e.is_fresh(now)) {
            entries.remove(key);
            debug!("Evicted expired cache entry {}", key.storage_key());
        }
        None
    }

    async fn put(&self, key: &CacheKey, jobs: Vec<CanonicalJob>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.clone(),
            CacheEntry {
                created_at: self.clock.now(),
                jobs,
            },
        );

        while entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }
}
