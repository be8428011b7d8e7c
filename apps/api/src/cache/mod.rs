//! Response Cache: short-TTL store of provider results keyed by the
//! normalized search, so repeated identical searches do not spend quota.
//!
//! The TTL is the correctness-bearing property: an entry that is six hours
//! old or older is never returned, whatever the backend.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::CanonicalJob;

pub use memory::InMemoryResponseCache;
pub use self::redis::RedisResponseCache;

pub fn cache_ttl() -> Duration {
    Duration::hours(6)
}

/// Exact-match lookup key. Query and location are lowercased, trimmed and
/// whitespace-collapsed so cosmetic differences hit the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub location: String,
    pub count: usize,
}

impl CacheKey {
    pub fn new(query: &str, location: &str, count: usize) -> Self {
        Self {
            query: normalize_component(query),
            location: normalize_component(location),
            count,
        }
    }

    /// Flat string form used by key-value backends.
    pub fn storage_key(&self) -> String {
        format!("jobcache:v1:{}|{}|{}", self.query, self.location, self.count)
    }
}

fn normalize_component(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub created_at: DateTime<Utc>,
    pub jobs: Vec<CanonicalJob>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < cache_ttl()
    }
}

/// Backends absorb their own failures: a broken cache behaves as a miss.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<Vec<CanonicalJob>>;

    /// Stores unconditionally, replacing any previous entry for `key`.
    async fn put(&self, key: &CacheKey, jobs: Vec<CanonicalJob>);
}
