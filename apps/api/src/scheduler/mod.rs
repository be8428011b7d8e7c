//! Daily Strategy Scheduler: a weekly rotation of targeted searches pushed
//! through the scraper into the Job Store, followed by retention pruning.
//!
//! A cycle never fails as a whole. Every problem is logged and counted in
//! the `CycleReport`; re-running a cycle only re-spends budgeted quota.

use std::sync::Arc;
use std::time::Duration;

use chrono::Weekday;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::scraper::{FallbackScraper, SearchSource};
use crate::store::{JobStore, UpsertOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchTarget {
    pub query: &'static str,
    pub location: &'static str,
    pub count: usize,
}

const fn target(query: &'static str, location: &'static str, count: usize) -> SearchTarget {
    SearchTarget {
        query,
        location,
        count,
    }
}

const MONDAY: &[SearchTarget] = &[
    target("software engineer", "Cairo, Egypt", 20),
    target("backend developer", "Lagos, Nigeria", 20),
    target("python developer", "Remote", 20),
];
const TUESDAY: &[SearchTarget] = &[
    target("data analyst", "Dubai, United Arab Emirates", 20),
    target("data scientist", "Nairobi, Kenya", 20),
];
const WEDNESDAY: &[SearchTarget] = &[
    target("frontend developer", "Riyadh, Saudi Arabia", 20),
    target("mobile developer", "Accra, Ghana", 20),
    target("react developer", "Remote", 20),
];
const THURSDAY: &[SearchTarget] = &[
    target("devops engineer", "Casablanca, Morocco", 15),
    target("cloud engineer", "Johannesburg, South Africa", 15),
    target("site reliability engineer", "Remote", 15),
    target("network engineer", "Amman, Jordan", 15),
];
const FRIDAY: &[SearchTarget] = &[
    target("product manager", "Doha, Qatar", 15),
    target("project manager", "Kigali, Rwanda", 15),
];
const SATURDAY: &[SearchTarget] = &[
    target("full stack developer", "Remote", 20),
    target("ui ux designer", "Tunis, Tunisia", 15),
    target("qa engineer", "Addis Ababa, Ethiopia", 15),
];
const SUNDAY: &[SearchTarget] = &[
    target("machine learning engineer", "Remote", 20),
    target("it support", "Kampala, Uganda", 15),
    target("cybersecurity analyst", "Kuwait City, Kuwait", 15),
];

/// The fixed searches assigned to a weekday.
pub fn rotation_for(weekday: Weekday) -> &'static [SearchTarget] {
    match weekday {
        Weekday::Mon => MONDAY,
        Weekday::Tue => TUESDAY,
        Weekday::Wed => WEDNESDAY,
        Weekday::Thu => THURSDAY,
        Weekday::Fri => FRIDAY,
        Weekday::Sat => SATURDAY,
        Weekday::Sun => SUNDAY,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub run_id: Uuid,
    pub weekday: String,
    pub searches: usize,
    pub jobs_scraped: usize,
    pub jobs_inserted: usize,
    pub jobs_updated: usize,
    pub store_errors: usize,
    /// Sources that answered, in search order. Repeats are kept.
    pub sources: Vec<String>,
    pub fallback_searches: usize,
    pub pruned: u64,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn jobs_stored(&self) -> usize {
        self.jobs_inserted + self.jobs_updated
    }
}

pub struct DailyStrategyScheduler {
    scraper: Arc<FallbackScraper>,
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    delay: Duration,
    retention_days: i64,
}

impl DailyStrategyScheduler {
    pub fn new(
        scraper: Arc<FallbackScraper>,
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        delay: Duration,
        retention_days: i64,
    ) -> Self {
        Self {
            scraper,
            store,
            clock,
            delay,
            retention_days,
        }
    }

    pub async fn run_daily_cycle(&self, weekday: Weekday) -> CycleReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("daily_cycle", %run_id, weekday = ?weekday);
        self.run_cycle(run_id, weekday).instrument(span).await
    }

    async fn run_cycle(&self, run_id: Uuid, weekday: Weekday) -> CycleReport {
        let started = tokio::time::Instant::now();
        let targets = rotation_for(weekday);
        let mut report = CycleReport {
            run_id,
            weekday: format!("{weekday:?}"),
            searches: targets.len(),
            jobs_scraped: 0,
            jobs_inserted: 0,
            jobs_updated: 0,
            store_errors: 0,
            sources: Vec::new(),
            fallback_searches: 0,
            pruned: 0,
            duration_ms: 0,
        };

        info!("Starting daily cycle with {} searches", targets.len());

        for (i, t) in targets.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let outcome = self.scraper.search(t.query, t.location, t.count).await;
            match &outcome.source {
                SearchSource::Fallback => {
                    report.fallback_searches += 1;
                    report.sources.push("fallback".to_string());
                    warn!("'{}' in '{}': no live provider, nothing stored", t.query, t.location);
                    continue;
                }
                SearchSource::Cache => report.sources.push("cache".to_string()),
                SearchSource::Provider(name) => report.sources.push(name.clone()),
            }

            report.jobs_scraped += outcome.jobs.len();
            for job in &outcome.jobs {
                match self.store.upsert(job).await {
                    Ok(UpsertOutcome::Inserted) => report.jobs_inserted += 1,
                    Ok(UpsertOutcome::Updated) => report.jobs_updated += 1,
                    Err(e) => {
                        report.store_errors += 1;
                        warn!("Failed to store {}: {e}", job.job_id);
                    }
                }
            }
        }

        match self
            .store
            .prune_older_than(self.retention_days, self.clock.now())
            .await
        {
            Ok(pruned) => report.pruned = pruned,
            Err(e) => {
                report.store_errors += 1;
                warn!("Retention pruning failed: {e}");
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            jobs_scraped = report.jobs_scraped,
            jobs_stored = report.jobs_stored(),
            store_errors = report.store_errors,
            pruned = report.pruned,
            duration_ms = report.duration_ms,
            "Daily cycle finished; sources: {}",
            report.sources.join(", ")
        );
        report
    }
}
