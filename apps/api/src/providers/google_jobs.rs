//! Google Jobs via SerpApi: search-engine aggregator.
//!
//! SerpApi reports most failures, including an exhausted plan, as a 200
//! with an `error` field, so the body is inspected before normalizing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::models::job::CanonicalJob;
use crate::providers::http;
use crate::providers::normalize::{canonicalize, employment_type_label, parse_posted_date, RawPosting};
use crate::providers::{JobProvider, ProviderError};

const EXHAUSTED_PHRASES: &[&str] = &["run out of searches", "exceeded", "quota"];
const NO_RESULTS_PHRASE: &str = "hasn't returned any results";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GoogleJobsResponse {
    pub error: Option<String>,
    pub jobs_results: Vec<GoogleJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GoogleJob {
    pub job_id: Option<String>,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub via: Option<String>,
    pub description: Option<String>,
    pub share_link: Option<String>,
    pub apply_options: Vec<LinkOption>,
    pub related_links: Vec<LinkOption>,
    pub detected_extensions: DetectedExtensions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkOption {
    pub title: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetectedExtensions {
    pub posted_at: Option<String>,
    pub schedule_type: Option<String>,
    pub work_from_home: Option<bool>,
}

pub struct GoogleJobsAdapter {
    config: ProviderConfig,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl GoogleJobsAdapter {
    pub fn new(config: ProviderConfig, client: Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            client,
            clock,
        }
    }

    fn request(&self, query: &str, location: &str) -> RequestBuilder {
        let mut params = vec![
            ("engine", "google_jobs"),
            ("q", query.trim()),
            ("hl", "en"),
            ("api_key", self.config.api_key.as_str()),
        ];
        if !location.trim().is_empty() {
            params.push(("location", location.trim()));
        }
        self.client.get(&self.config.endpoint).query(&params)
    }
}

#[async_trait]
impl JobProvider for GoogleJobsAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        count: usize,
    ) -> Result<Vec<CanonicalJob>, ProviderError> {
        let response: GoogleJobsResponse =
            http::fetch_json(&self.config.name, self.request(query, location)).await?;
        normalize_response(&self.config.name, response, count, self.clock.now())
    }
}

pub fn normalize_response(
    provider: &str,
    response: GoogleJobsResponse,
    count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<CanonicalJob>, ProviderError> {
    if let Some(error) = response.error {
        let lowered = error.to_lowercase();
        if lowered.contains(NO_RESULTS_PHRASE) {
            return Ok(Vec::new());
        }
        if EXHAUSTED_PHRASES.iter().any(|p| lowered.contains(p)) {
            return Err(ProviderError::QuotaExceeded {
                provider: provider.to_string(),
                detail: error,
            });
        }
        return Err(ProviderError::Unavailable {
            provider: provider.to_string(),
            detail: error,
            reached_remote: true,
        });
    }

    let postings = response.jobs_results.into_iter().map(|job| to_posting(job, now));
    Ok(canonicalize(provider, postings, count, now))
}

fn first_link(options: &[LinkOption]) -> Option<String> {
    options.iter().find_map(|o| o.link.clone())
}

fn to_posting(job: GoogleJob, now: DateTime<Utc>) -> RawPosting {
    let ext = job.detected_extensions;
    RawPosting {
        native_id: job.job_id.unwrap_or_default(),
        title: job.title.unwrap_or_default(),
        company: job.company_name.unwrap_or_default(),
        location: job.location.unwrap_or_default(),
        description: job.description.unwrap_or_default(),
        job_type: ext.schedule_type.as_deref().map(employment_type_label),
        salary: None,
        // SerpApi only ever sets the flag when it is true
        remote_flag: ext.work_from_home.filter(|wfh| *wfh),
        apply_url: first_link(&job.apply_options),
        related_url: first_link(&job.related_links).or(job.share_link),
        posted_at: ext
            .posted_at
            .as_deref()
            .and_then(|raw| parse_posted_date(raw, now)),
    }
}
