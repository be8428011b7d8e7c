//! Job Store: deduplicating upsert of canonical jobs keyed by `job_id`,
//! plus retention pruning.

pub mod classify;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::errors::StoreError;
use crate::models::job::CanonicalJob;

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Persistent home of canonical jobs. Every mutation is atomic per record;
/// records are independent so no cross-record locking is needed.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new job or refreshes the mutable fields of an existing one.
    async fn upsert(&self, job: &CanonicalJob) -> Result<UpsertOutcome, StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<CanonicalJob>, StoreError>;

    /// Most recent jobs first (posted date, falling back to fetch time), ties by `job_id`.
    async fn recent(&self, limit: usize) -> Result<Vec<CanonicalJob>, StoreError>;

    /// Deletes jobs whose effective date is before `now - days`. Returns the count removed.
    async fn prune_older_than(&self, days: i64, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

pub fn retention_cutoff(days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Applies a later sighting of the same job onto the stored record. Identity
/// and classification set at first sight are kept.
pub fn merge_sighting(existing: &mut CanonicalJob, newer: &CanonicalJob) {
    existing.description = newer.description.clone();
    existing.required_skills = newer.required_skills.clone();
    existing.salary = newer.salary.clone();
    existing.posted_date = newer.posted_date;
    existing.fetched_at = newer.fetched_at;
    existing.url = newer.url.clone();
}
