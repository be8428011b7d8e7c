//! LinkedIn job feed (RapidAPI): professional-network source.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::models::job::{CanonicalJob, SalaryRange};
use crate::providers::http;
use crate::providers::normalize::{canonicalize, employment_type_label, parse_posted_date, RawPosting};
use crate::providers::{JobProvider, ProviderError};

/// The feed's page size ceiling.
const MAX_LIMIT: usize = 100;

/// Native ids come back as numbers or strings depending on the plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NativeId {
    Number(u64),
    Text(String),
}

impl NativeId {
    fn into_string(self) -> String {
        match self {
            NativeId::Number(n) => n.to_string(),
            NativeId::Text(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkedInSalary {
    pub currency: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkedInJob {
    pub id: Option<NativeId>,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub organization_url: Option<String>,
    pub url: Option<String>,
    pub external_apply_url: Option<String>,
    pub date_posted: Option<String>,
    pub locations_derived: Vec<String>,
    pub remote_derived: Option<bool>,
    pub employment_type: Vec<String>,
    pub description_text: Option<String>,
    pub salary: Option<LinkedInSalary>,
}

pub struct LinkedInAdapter {
    config: ProviderConfig,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl LinkedInAdapter {
    pub fn new(config: ProviderConfig, client: Client, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            client,
            clock,
        }
    }

    fn request(&self, query: &str, location: &str, count: usize) -> RequestBuilder {
        let limit = count.clamp(1, MAX_LIMIT).to_string();
        let mut params = vec![
            ("title_filter", query.trim().to_string()),
            ("limit", limit),
            ("offset", "0".to_string()),
            ("description_type", "text".to_string()),
        ];
        if !location.trim().is_empty() {
            params.push(("location_filter", location.trim().to_string()));
        }
        let request = self.client.get(&self.config.endpoint).query(&params);
        http::with_rapidapi_auth(request, &self.config.endpoint, &self.config.api_key)
    }
}

#[async_trait]
impl JobProvider for LinkedInAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        count: usize,
    ) -> Result<Vec<CanonicalJob>, ProviderError> {
        let response: Vec<LinkedInJob> =
            http::fetch_json(&self.config.name, self.request(query, location, count)).await?;
        Ok(normalize_response(&self.config.name, response, count, self.clock.now()))
    }
}

pub fn normalize_response(
    provider: &str,
    response: Vec<LinkedInJob>,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<CanonicalJob> {
    let postings = response.into_iter().map(|job| to_posting(job, now));
    canonicalize(provider, postings, count, now)
}

fn to_posting(job: LinkedInJob, now: DateTime<Utc>) -> RawPosting {
    let salary = job
        .salary
        .filter(|s| s.min_value.is_some() || s.max_value.is_some())
        .map(|s| SalaryRange {
            min: s.min_value,
            max: s.max_value,
            currency: s.currency,
        });

    RawPosting {
        native_id: job.id.map(NativeId::into_string).unwrap_or_default(),
        title: job.title.unwrap_or_default(),
        company: job.organization.unwrap_or_default(),
        location: job.locations_derived.join("; "),
        description: job.description_text.unwrap_or_default(),
        job_type: job.employment_type.first().map(|t| employment_type_label(t)),
        salary,
        remote_flag: job.remote_derived,
        // external apply page first, then the LinkedIn posting, then the company site
        apply_url: job.external_apply_url.or(job.url),
        related_url: job.organization_url,
        posted_at: job
            .date_posted
            .as_deref()
            .and_then(|raw| parse_posted_date(raw, now)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::job::{ExperienceLevel, Region};

    const FIXTURE: &str = r#"[
        {
            "id": 1789001,
            "title": "Senior Backend Engineer (Remote)",
            "organization": "Savannah Pay",
            "organization_url": "https://www.linkedin.com/company/savannah-pay",
            "url": "https://www.linkedin.com/jobs/view/1789001",
            "external_apply_url": null,
            "date_posted": "2025-10-12T08:00:00",
            "locations_derived": ["Nairobi, Nairobi County, Kenya"],
            "remote_derived": true,
            "employment_type": ["FULL_TIME"],
            "description_text": "Go, PostgreSQL, Kubernetes and AWS."
        },
        {
            "id": "abc-2",
            "title": "Marketing Lead",
            "organization": "Gulf Brands",
            "locations_derived": ["Dubai, United Arab Emirates"],
            "employment_type": ["CONTRACTOR"],
            "salary": {"currency": "AED", "min_value": 20000, "max_value": 30000}
        }
    ]"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_normalize_fixture() {
        let response: Vec<LinkedInJob> = serde_json::from_str(FIXTURE).unwrap();
        let jobs = normalize_response("linkedin", response, 10, now());
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.job_id, "linkedin_1789001");
        assert_eq!(first.region, Region::SubSaharanAfrica);
        assert_eq!(first.experience_level, ExperienceLevel::Senior);
        assert!(first.is_remote);
        assert_eq!(first.url, "https://www.linkedin.com/jobs/view/1789001");
        // bare "go" is too ambiguous to count as a skill; only "golang" is
        assert_eq!(first.required_skills, vec!["postgresql", "kubernetes", "aws"]);
        assert_eq!(
            first.posted_date,
            Some(Utc.with_ymd_and_hms(2025, 10, 12, 8, 0, 0).unwrap())
        );

        let second = &jobs[1];
        assert_eq!(second.job_id, "linkedin_abc-2");
        assert_eq!(second.region, Region::Mena);
        assert_eq!(second.experience_level, ExperienceLevel::Lead);
        assert_eq!(second.job_type, "Contract");
        assert_eq!(second.salary.as_ref().and_then(|s| s.currency.clone()), Some("AED".into()));
        // no apply or posting link: the search-engine fallback is used
        assert!(second.url.starts_with("https://www.google.com/search?q="));
        assert!(!second.is_remote);
    }

    #[test]
    fn test_count_truncates() {
        let response: Vec<LinkedInJob> = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(normalize_response("linkedin", response, 1, now()).len(), 1);
    }
}
