use std::fmt;

use anyhow::{Context, Result};

/// The external job sources this service knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// SerpApi Google Jobs (search-engine aggregator).
    GoogleJobs,
    /// LinkedIn job feed via RapidAPI (professional network).
    LinkedIn,
    /// JSearch via RapidAPI (multi-board aggregator).
    JSearch,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::GoogleJobs,
        ProviderKind::LinkedIn,
        ProviderKind::JSearch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::GoogleJobs => "google_jobs",
            ProviderKind::LinkedIn => "linkedin",
            ProviderKind::JSearch => "jsearch",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::GoogleJobs => "GOOGLE_JOBS",
            ProviderKind::LinkedIn => "LINKEDIN",
            ProviderKind::JSearch => "JSEARCH",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::GoogleJobs => "https://serpapi.com/search.json",
            ProviderKind::LinkedIn => "https://linkedin-job-search-api.p.rapidapi.com/active-jb-7d",
            ProviderKind::JSearch => "https://jsearch.p.rapidapi.com/search",
        }
    }

    fn default_priority(&self) -> u32 {
        match self {
            ProviderKind::GoogleJobs => 1,
            ProviderKind::LinkedIn => 2,
            ProviderKind::JSearch => 3,
        }
    }

    fn default_monthly_quota(&self) -> u32 {
        match self {
            ProviderKind::GoogleJobs => 100,
            ProviderKind::LinkedIn => 250,
            ProviderKind::JSearch => 200,
        }
    }
}

/// Static configuration for one provider. Immutable after load.
#[derive(Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    /// Lower is tried first.
    pub priority: u32,
    pub endpoint: String,
    pub monthly_quota: u32,
    pub api_key: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("endpoint", &self.endpoint)
            .field("monthly_quota", &self.monthly_quota)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub provider_timeout_secs: u64,
    pub cache_max_entries: usize,
    pub scheduler_delay_secs: u64,
    pub job_retention_days: i64,
    pub match_pool_size: usize,
    /// Enabled providers, sorted by ascending priority.
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            redis_url: optional_env("REDIS_URL"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            provider_timeout_secs: parse_env("PROVIDER_TIMEOUT_SECS", 10)?,
            cache_max_entries: parse_env("CACHE_MAX_ENTRIES", 256)?,
            scheduler_delay_secs: parse_env("SCHEDULER_DELAY_SECS", 3)?,
            job_retention_days: parse_env("JOB_RETENTION_DAYS", 30)?,
            match_pool_size: parse_env("MATCH_POOL_SIZE", 500)?,
            providers: load_providers()?,
        })
    }
}

/// Reads every known provider; a provider without an API key is disabled.
fn load_providers() -> Result<Vec<ProviderConfig>> {
    let mut providers = Vec::new();
    for kind in ProviderKind::ALL {
        let prefix = kind.env_prefix();
        let Some(api_key) = optional_env(&format!("{prefix}_API_KEY")) else {
            continue;
        };
        providers.push(ProviderConfig {
            name: kind.name().to_string(),
            kind,
            priority: parse_env(&format!("{prefix}_PRIORITY"), kind.default_priority())?,
            endpoint: optional_env(&format!("{prefix}_ENDPOINT"))
                .unwrap_or_else(|| kind.default_endpoint().to_string()),
            monthly_quota: parse_env(
                &format!("{prefix}_MONTHLY_QUOTA"),
                kind.default_monthly_quota(),
            )?,
            api_key,
        });
    }
    providers.sort_by_key(|p| p.priority);
    Ok(providers)
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            name: "jsearch".to_string(),
            kind: ProviderKind::JSearch,
            priority: 3,
            endpoint: "https://example.test".to_string(),
            monthly_quota: 200,
            api_key: "super-secret".to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u64 = parse_env("JOBPULSE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_default_priorities_are_distinct() {
        let mut priorities: Vec<u32> = ProviderKind::ALL
            .iter()
            .map(|k| k.default_priority())
            .collect();
        priorities.dedup();
        assert_eq!(priorities.len(), 3);
    }
}
