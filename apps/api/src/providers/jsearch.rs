//! JSearch (RapidAPI): multi-board aggregator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::models::job::{CanonicalJob, SalaryRange};
use crate::providers::http;
use crate::providers::normalize::{canonicalize, employment_type_label, parse_posted_date, RawPosting};
use crate::providers::{JobProvider, ProviderError};

/// JSearch returns ten results per page and bills every page as a request.
/// The quota ledger counts one unit per search, so one page is fetched.
const PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
pub struct JSearchResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Vec<JSearchJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JSearchJob {
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub employer_name: Option<String>,
    pub employer_website: Option<String>,
    pub job_description: Option<String>,
    pub job_employment_type: Option<String>,
    pub job_is_remote: Option<bool>,
    pub job_apply_link: Option<String>,
    pub job_google_link: Option<String>,
    pub job_location: Option<String>,
    pub job_city: Option<String>,
    pub job_state: Option<String>,
    pub job_country: Option<String>,
    pub job_posted_at_datetime_utc: Option<String>,
    pub job_posted_at_timestamp: Option<i64>,
    pub job_posted_human_readable: Option<String>,
    pub job_min_salary: Option<f64>,
    pub job_max_salary: Option<f64>,
    pub job_salary_currency: Option<String>,
}

pub struct JSearchAdapter {
    config: ProviderConfig,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl JSearchAdapter {
    pub fn new(config: ProviderConfig, client: Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            client,
            clock,
        }
    }

    fn request(&self, query: &str, location: &str) -> RequestBuilder {
        let request = self.client.get(&self.config.endpoint).query(&[
            ("query", search_phrase(query, location).as_str()),
            ("page", "1"),
            ("num_pages", "1"),
        ]);
        http::with_rapidapi_auth(request, &self.config.endpoint, &self.config.api_key)
    }
}

fn search_phrase(query: &str, location: &str) -> String {
    let (query, location) = (query.trim(), location.trim());
    if location.is_empty() {
        query.to_string()
    } else {
        format!("{query} in {location}")
    }
}

#[async_trait]
impl JobProvider for JSearchAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        count: usize,
    ) -> Result<Vec<CanonicalJob>, ProviderError> {
        let response: JSearchResponse =
            http::fetch_json(&self.config.name, self.request(query, location)).await?;
        normalize_response(&self.config.name, response, count.min(PAGE_SIZE), self.clock.now())
    }
}

pub fn normalize_response(
    provider: &str,
    response: JSearchResponse,
    count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<CanonicalJob>, ProviderError> {
    if response.status.as_deref() == Some("ERROR") {
        return Err(ProviderError::Unavailable {
            provider: provider.to_string(),
            detail: "status ERROR".to_string(),
            reached_remote: true,
        });
    }
    let postings = response.data.into_iter().map(|job| to_posting(job, now));
    Ok(canonicalize(provider, postings, count, now))
}

fn to_posting(job: JSearchJob, now: DateTime<Utc>) -> RawPosting {
    let location = job.job_location.filter(|l| !l.trim().is_empty()).unwrap_or_else(|| {
        [&job.job_city, &job.job_state, &job.job_country]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    });

    let posted_at = job
        .job_posted_at_datetime_utc
        .as_deref()
        .and_then(|raw| parse_posted_date(raw, now))
        .or_else(|| {
            job.job_posted_at_timestamp
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        })
        .or_else(|| {
            job.job_posted_human_readable
                .as_deref()
                .and_then(|raw| parse_posted_date(raw, now))
        });

    let salary = (job.job_min_salary.is_some() || job.job_max_salary.is_some()).then(|| SalaryRange {
        min: job.job_min_salary,
        max: job.job_max_salary,
        currency: job.job_salary_currency.clone(),
    });

    RawPosting {
        native_id: job.job_id.unwrap_or_default(),
        title: job.job_title.unwrap_or_default(),
        company: job.employer_name.unwrap_or_default(),
        location,
        description: job.job_description.unwrap_or_default(),
        job_type: job.job_employment_type.as_deref().map(employment_type_label),
        salary,
        remote_flag: job.job_is_remote,
        apply_url: job.job_apply_link,
        related_url: job.job_google_link.or(job.employer_website),
        posted_at,
    }
}
