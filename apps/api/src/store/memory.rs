use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::models::job::CanonicalJob;
use crate::store::{merge_sighting, retention_cutoff, JobStore, UpsertOutcome};

/// Process-local store. State is lost on restart.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, CanonicalJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn upsert(&self, job: &CanonicalJob) -> Result<UpsertOutcome, StoreError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.job_id) {
            Some(existing) => {
                merge_sighting(existing, job);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                jobs.insert(job.job_id.clone(), job.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<CanonicalJob>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CanonicalJob>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<CanonicalJob> = jobs.values().cloned().collect();
        all.sort_by(|a, b| {
            b.effective_date()
                .cmp(&a.effective_date())
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        all.truncate(limit);
        Ok(all)
    }

    async fn prune_older_than(&self, days: i64, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff = retention_cutoff(days, now);
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.effective_date() >= cutoff);
        Ok((before - jobs.len()) as u64)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.jobs.read().await.len() as u64)
    }
}
