//! Fallback Scraper: cache first, then providers in priority order, then
//! the static dataset. The first provider returning jobs wins; results are
//! never merged across providers.

pub mod fallback_data;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::budget::BudgetGovernor;
use crate::cache::{CacheKey, ResponseCache};
use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::models::job::CanonicalJob;
use crate::providers::{JobProvider, ProviderError};

use self::fallback_data::fallback_jobs;

/// Where a search result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum SearchSource {
    Cache,
    Provider(String),
    /// No provider was available; the static dataset was served.
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub source: SearchSource,
    pub jobs: Vec<CanonicalJob>,
}

impl SearchOutcome {
    pub fn is_live(&self) -> bool {
        matches!(self.source, SearchSource::Provider(_))
    }
}

pub struct FallbackScraper {
    providers: Vec<Arc<dyn JobProvider>>,
    governor: Arc<BudgetGovernor>,
    cache: Arc<dyn ResponseCache>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl FallbackScraper {
    pub fn new(
        mut providers: Vec<Arc<dyn JobProvider>>,
        governor: Arc<BudgetGovernor>,
        cache: Arc<dyn ResponseCache>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        providers.sort_by_key(|p| p.config().priority);
        Self {
            providers,
            governor,
            cache,
            clock,
            timeout,
        }
    }

    /// Provider configs in the order they are tried.
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.providers.iter().map(|p| p.config().clone()).collect()
    }

    pub fn governor(&self) -> &BudgetGovernor {
        &self.governor
    }

    /// Never fails: provider problems end in the fallback dataset.
    pub async fn search(&self, query: &str, location: &str, count: usize) -> SearchOutcome {
        let key = CacheKey::new(query, location, count);
        if let Some(jobs) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key.storage_key());
            return SearchOutcome {
                source: SearchSource::Cache,
                jobs,
            };
        }

        for provider in &self.providers {
            let config = provider.config();

            match self.governor.daily_budget(config).await {
                Ok(0) => {
                    info!("Skipping {}: no budget left this month", config.name);
                    continue;
                }
                Ok(budget) => debug!("{} daily budget: {budget}", config.name),
                Err(e) => {
                    warn!("Skipping {}: quota ledger unreadable: {e}", config.name);
                    continue;
                }
            }

            // The unit is taken before the request so concurrent searches
            // cannot spend the same remaining call twice.
            match self.governor.try_reserve(config).await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Skipping {}: last unit of quota taken concurrently", config.name);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {}: could not reserve quota: {e}", config.name);
                    continue;
                }
            }

            let result = match tokio::time::timeout(
                self.timeout,
                provider.search(query, location, count),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Unavailable {
                    provider: config.name.clone(),
                    detail: format!("timed out after {}s", self.timeout.as_secs()),
                    reached_remote: true,
                }),
            };

            match result {
                Ok(jobs) => {
                    if jobs.is_empty() {
                        info!("{} returned no jobs for '{query}' in '{location}'", config.name);
                        continue;
                    }
                    info!("{} returned {} jobs", config.name, jobs.len());
                    self.cache.put(&key, jobs.clone()).await;
                    return SearchOutcome {
                        source: SearchSource::Provider(config.name.clone()),
                        jobs,
                    };
                }
                Err(err @ ProviderError::QuotaExceeded { .. }) => {
                    warn!(provider = %config.name, kind = err.kind(), "{err}");
                    if let Err(e) = self.governor.note_quota_exceeded(config).await {
                        warn!("Could not mark {} exhausted: {e}", config.name);
                    }
                }
                Err(err) => {
                    warn!(provider = %config.name, kind = err.kind(), "{err}");
                    if !err.reached_remote() {
                        if let Err(e) = self.governor.release(config).await {
                            warn!("Could not release reserved call for {}: {e}", config.name);
                        }
                    }
                }
            }
        }

        warn!("No providers available for '{query}' in '{location}', serving fallback dataset");
        let mut jobs = fallback_jobs(self.clock.now());
        jobs.truncate(count.max(1));
        SearchOutcome {
            source: SearchSource::Fallback,
            jobs,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::*;
    use crate::budget::{InMemoryQuotaLedger, QuotaLedger};
    use crate::cache::InMemoryResponseCache;
    use crate::clock::FixedClock;
    use crate::config::ProviderKind;
    use crate::models::job::{ExperienceLevel, Region};

    #[derive(Clone, Copy)]
    pub(crate) enum Script {
        Jobs(usize),
        Empty,
        Quota,
        Offline,
        ServerError,
        Malformed,
        Hang,
        /// Answers with `n` jobs after 50ms.
        Slow(usize),
    }

    pub(crate) struct ScriptedProvider {
        config: ProviderConfig,
        script: Script,
        clock: Arc<FixedClock>,
        pub calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(name: &str, priority: u32, script: Script, clock: Arc<FixedClock>) -> Self {
            Self {
                config: ProviderConfig {
                    name: name.to_string(),
                    kind: ProviderKind::JSearch,
                    priority,
                    endpoint: "https://example.test".to_string(),
                    monthly_quota: 100,
                    api_key: "key".to_string(),
                },
                script,
                clock,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn sample_job(provider: &str, n: usize, now: chrono::DateTime<Utc>) -> CanonicalJob {
        CanonicalJob {
            job_id: format!("{provider}_{n}"),
            title: format!("Python Developer {n}"),
            company: "Acme".to_string(),
            location: "Cairo, Egypt".to_string(),
            region: Region::Mena,
            job_type: "Full-time".to_string(),
            experience_level: ExperienceLevel::Mid,
            description: "Python and Docker".to_string(),
            required_skills: vec!["python".to_string(), "docker".to_string()],
            salary: None,
            is_remote: false,
            url: format!("https://example.test/{provider}/{n}"),
            source: provider.to_string(),
            posted_date: Some(now - ChronoDuration::days(n as i64)),
            fetched_at: now,
        }
    }

    #[async_trait]
    impl JobProvider for ScriptedProvider {
        fn config(&self) -> &ProviderConfig {
            &self.config
        }

        async fn search(
            &self,
            _query: &str,
            _location: &str,
            count: usize,
        ) -> Result<Vec<CanonicalJob>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let provider = self.config.name.clone();
            match self.script {
                Script::Jobs(n) => Ok((1..=n.min(count))
                    .map(|i| sample_job(&provider, i, self.clock.now()))
                    .collect()),
                Script::Empty => Ok(vec![]),
                Script::Quota => Err(ProviderError::QuotaExceeded {
                    provider,
                    detail: "HTTP 429".to_string(),
                }),
                Script::Offline => Err(ProviderError::Unavailable {
                    provider,
                    detail: "connection refused".to_string(),
                    reached_remote: false,
                }),
                Script::ServerError => Err(ProviderError::Unavailable {
                    provider,
                    detail: "HTTP 503".to_string(),
                    reached_remote: true,
                }),
                Script::Malformed => Err(ProviderError::MalformedResponse {
                    provider,
                    detail: "expected value".to_string(),
                }),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec![])
                }
                Script::Slow(n) => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok((1..=n.min(count))
                        .map(|i| sample_job(&provider, i, self.clock.now()))
                        .collect())
                }
            }
        }
    }

    struct Harness {
        clock: Arc<FixedClock>,
        ledger: Arc<InMemoryQuotaLedger>,
        cache: Arc<InMemoryResponseCache>,
        providers: Vec<Arc<ScriptedProvider>>,
        scraper: Arc<FallbackScraper>,
    }

    fn harness(scripts: &[(&str, u32, Script)]) -> Harness {
        let clock = Arc::new(FixedClock::at(2025, 10, 15, 9));
        let ledger = Arc::new(InMemoryQuotaLedger::new());
        let cache = Arc::new(InMemoryResponseCache::new(clock.clone(), 64));
        let providers: Vec<Arc<ScriptedProvider>> = scripts
            .iter()
            .map(|(name, priority, script)| {
                Arc::new(ScriptedProvider::new(name, *priority, *script, clock.clone()))
            })
            .collect();
        let governor = Arc::new(BudgetGovernor::new(ledger.clone(), clock.clone()));
        let scraper = Arc::new(FallbackScraper::new(
            providers
                .iter()
                .map(|p| p.clone() as Arc<dyn JobProvider>)
                .collect(),
            governor,
            cache.clone(),
            clock.clone(),
            Duration::from_secs(10),
        ));
        Harness {
            clock,
            ledger,
            cache,
            providers,
            scraper,
        }
    }

    #[tokio::test]
    async fn test_all_quota_exceeded_serves_fallback() {
        let h = harness(&[
            ("google_jobs", 1, Script::Quota),
            ("linkedin", 2, Script::Quota),
            ("jsearch", 3, Script::Quota),
        ]);
        let outcome = h.scraper.search("python developer", "Cairo", 10).await;

        assert_eq!(outcome.source, SearchSource::Fallback);
        assert!(!outcome.jobs.is_empty());
        assert!(outcome.jobs.iter().all(|j| j.source == "fallback"));

        // every provider is now exhausted for the month and is not called again
        let again = h.scraper.search("rust developer", "Lagos", 10).await;
        assert_eq!(again.source, SearchSource::Fallback);
        for provider in &h.providers {
            assert_eq!(provider.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_fallback_results_are_not_cached() {
        let h = harness(&[("jsearch", 1, Script::Offline)]);
        h.scraper.search("python", "Cairo", 10).await;
        assert!(h.cache.get(&CacheKey::new("python", "Cairo", 10)).await.is_none());
    }

    #[tokio::test]
    async fn test_first_success_wins_in_priority_order() {
        // registered out of order on purpose
        let h = harness(&[
            ("jsearch", 3, Script::Jobs(5)),
            ("linkedin", 2, Script::Jobs(5)),
            ("google_jobs", 1, Script::Offline),
        ]);
        let outcome = h.scraper.search("python", "Cairo", 3).await;

        assert_eq!(outcome.source, SearchSource::Provider("linkedin".to_string()));
        assert_eq!(outcome.jobs.len(), 3);
        assert!(outcome.jobs.iter().all(|j| j.source == "linkedin"));
        assert_eq!(h.providers[0].calls(), 0, "jsearch must not be tried");

        let now = h.clock.now();
        assert_eq!(h.ledger.calls_used("google_jobs", now).await.unwrap(), 0);
        assert_eq!(h.ledger.calls_used("linkedin", now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failures_that_reached_remote_are_recorded() {
        let h = harness(&[
            ("a", 1, Script::ServerError),
            ("b", 2, Script::Malformed),
            ("c", 3, Script::Empty),
            ("d", 4, Script::Jobs(2)),
        ]);
        let outcome = h.scraper.search("python", "Cairo", 10).await;
        assert_eq!(outcome.source, SearchSource::Provider("d".to_string()));

        let now = h.clock.now();
        for name in ["a", "b", "c", "d"] {
            assert_eq!(h.ledger.calls_used(name, now).await.unwrap(), 1, "{name}");
        }
    }

    #[tokio::test]
    async fn test_unreached_provider_call_is_refunded() {
        let h = harness(&[("a", 1, Script::Offline), ("b", 2, Script::Jobs(1))]);
        h.scraper.search("python", "Cairo", 10).await;

        let now = h.clock.now();
        assert_eq!(h.providers[0].calls(), 1);
        assert_eq!(h.ledger.calls_used("a", now).await.unwrap(), 0);
        assert_eq!(h.ledger.calls_used("b", now).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_searches_never_spend_past_quota() {
        let h = harness(&[("jsearch", 1, Script::Slow(2))]);
        let now = h.clock.now();
        // 99 of 100 used: exactly one call remains this month
        h.ledger.mark_exhausted("jsearch", 99, now).await.unwrap();

        let first = {
            let scraper = h.scraper.clone();
            tokio::spawn(async move { scraper.search("python", "Cairo", 10).await })
        };
        let second = {
            let scraper = h.scraper.clone();
            tokio::spawn(async move { scraper.search("rust", "Lagos", 10).await })
        };
        let outcomes = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(h.ledger.calls_used("jsearch", now).await.unwrap(), 100);
        assert_eq!(h.providers[0].calls(), 1);
        assert_eq!(outcomes.iter().filter(|o| o.is_live()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| o.source == SearchSource::Fallback)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_providers() {
        let h = harness(&[("jsearch", 1, Script::Jobs(2))]);
        let first = h.scraper.search("Python", "Cairo", 10).await;
        let second = h.scraper.search("  python ", "CAIRO", 10).await;

        assert!(first.is_live());
        assert_eq!(second.source, SearchSource::Cache);
        assert_eq!(second.jobs, first.jobs);
        assert_eq!(h.providers[0].calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_expires_after_six_hours() {
        let h = harness(&[("jsearch", 1, Script::Jobs(2))]);
        h.scraper.search("python", "Cairo", 10).await;
        h.clock.advance(ChronoDuration::hours(6));
        let outcome = h.scraper.search("python", "Cairo", 10).await;
        assert!(outcome.is_live());
        assert_eq!(h.providers[0].calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_provider_is_skipped() {
        let h = harness(&[("google_jobs", 1, Script::Jobs(2)), ("jsearch", 2, Script::Jobs(2))]);
        h.ledger
            .mark_exhausted("google_jobs", 100, h.clock.now())
            .await
            .unwrap();

        let outcome = h.scraper.search("python", "Cairo", 10).await;
        assert_eq!(outcome.source, SearchSource::Provider("jsearch".to_string()));
        assert_eq!(h.providers[0].calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out_and_next_is_tried() {
        let h = harness(&[("slow", 1, Script::Hang), ("fast", 2, Script::Jobs(1))]);
        let outcome = h.scraper.search("python", "Cairo", 10).await;

        assert_eq!(outcome.source, SearchSource::Provider("fast".to_string()));
        // a timed-out request is assumed to have reached the provider
        let now = h.clock.now();
        assert_eq!(h.ledger.calls_used("slow", now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_month_rollover_restores_exhausted_provider() {
        let h = harness(&[("jsearch", 1, Script::Quota)]);
        h.scraper.search("python", "Cairo", 10).await;
        assert_eq!(h.providers[0].calls(), 1);

        h.clock.set(Utc.with_ymd_and_hms(2025, 11, 1, 6, 0, 0).unwrap());
        h.scraper.search("python", "Cairo", 10).await;
        assert_eq!(h.providers[0].calls(), 2);
    }
}
