//! Outbound operations of the aggregation engine: search, match and budget
//! introspection. Provider failures are absorbed below this layer; only
//! invalid candidate input and storage failures reach callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{info, warn};

use crate::budget::BudgetStatus;
use crate::clock::Clock;
use crate::errors::AppError;
use crate::matching::{match_jobs, CandidateProfile, MatchResult};
use crate::models::job::CanonicalJob;
use crate::scraper::fallback_data::fallback_jobs;
use crate::scraper::{FallbackScraper, SearchOutcome};
use crate::store::JobStore;

pub struct JobEngine {
    scraper: Arc<FallbackScraper>,
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    match_pool_size: usize,
}

impl JobEngine {
    pub fn new(
        scraper: Arc<FallbackScraper>,
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        match_pool_size: usize,
    ) -> Self {
        Self {
            scraper,
            store,
            clock,
            match_pool_size,
        }
    }

    /// Fresh listings for a query. Live results are upserted into the store;
    /// a failed upsert is logged and does not affect the returned jobs.
    pub async fn search_jobs(&self, query: &str, location: &str, count: usize) -> SearchOutcome {
        let outcome = self.scraper.search(query, location, count).await;
        if outcome.is_live() {
            for job in &outcome.jobs {
                if let Err(e) = self.store.upsert(job).await {
                    warn!("Could not store {}: {e}", job.job_id);
                }
            }
        }
        outcome
    }

    pub async fn get_job(&self, job_id: &str) -> Result<CanonicalJob, AppError> {
        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job '{job_id}' not found")))
    }

    /// Ranks a bounded pool of recent stored jobs for the candidate. With an
    /// empty store the static fallback dataset is scored instead.
    pub async fn match_candidate(
        &self,
        profile: &CandidateProfile,
        min_score: u8,
        limit: usize,
    ) -> Result<Vec<MatchResult>, AppError> {
        let validated = profile.validate()?;

        let mut pool = self.store.recent(self.match_pool_size).await?;
        if pool.is_empty() {
            info!("Job store is empty, matching against the fallback dataset");
            pool = fallback_jobs(self.clock.now());
        }

        let mut results = match_jobs(&validated, &pool, min_score, &self.priorities());
        results.truncate(limit);
        Ok(results)
    }

    pub async fn budget_status(&self) -> Result<BTreeMap<String, BudgetStatus>, AppError> {
        let configs = self.scraper.provider_configs();
        Ok(self.scraper.governor().status(&configs).await?)
    }

    pub async fn stored_job_count(&self) -> Result<u64, AppError> {
        Ok(self.store.count().await?)
    }

    fn priorities(&self) -> HashMap<String, u32> {
        self.scraper
            .provider_configs()
            .into_iter()
            .map(|c| (c.name, c.priority))
            .collect()
    }
}
