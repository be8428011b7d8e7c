//! Provider-independent normalization: URL resolution, remote detection,
//! posted-date parsing and the final `CanonicalJob` assembly.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::Url;
use tracing::debug;

use crate::models::job::{qualified_job_id, CanonicalJob, SalaryRange, DEFAULT_JOB_TYPE};
use crate::store::classify::{
    classify_region, contains_any, detect_experience_level, extract_skills, normalize_text,
};

const SEARCH_ENGINE_URL: &str = "https://www.google.com/search";

const REMOTE_TERMS: &[&str] = &[
    "remote",
    "fully remote",
    "work from home",
    "wfh",
    "telecommute",
    "fully distributed",
    "anywhere",
];

const ON_SITE_TERMS: &[&str] = &[
    "no remote",
    "not remote",
    "on-site only",
    "onsite only",
    "remote not available",
];

/// A posting as an adapter extracted it, before classification.
#[derive(Debug, Clone, Default)]
pub struct RawPosting {
    pub native_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub job_type: Option<String>,
    pub salary: Option<SalaryRange>,
    /// Explicit remote flag from the provider, if it has one.
    pub remote_flag: Option<bool>,
    pub apply_url: Option<String>,
    pub related_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Direct apply link, then a related/career link, then a search-engine query.
/// Never returns an empty string.
pub fn resolve_url(
    apply_url: Option<&str>,
    related_url: Option<&str>,
    title: &str,
    company: &str,
    location: &str,
) -> String {
    [apply_url, related_url]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|u| u.starts_with("http://") || u.starts_with("https://"))
        .map(str::to_string)
        .unwrap_or_else(|| search_engine_url(title, company, location))
}

fn search_engine_url(title: &str, company: &str, location: &str) -> String {
    let terms = [title, company, location]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let q = format!("{terms} jobs");
    Url::parse_with_params(SEARCH_ENGINE_URL, &[("q", q.trim())])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| SEARCH_ENGINE_URL.to_string())
}

/// The provider's own flag wins; otherwise keywords decide, and an explicit
/// on-site phrase overrides any remote keyword.
pub fn detect_remote(flag: Option<bool>, title: &str, location: &str, description: &str) -> bool {
    if let Some(flag) = flag {
        return flag;
    }
    let text = normalize_text(&format!("{title} {location} {description}"));
    if contains_any(&text, ON_SITE_TERMS) {
        return false;
    }
    contains_any(&text, REMOTE_TERMS)
}

/// Parses absolute timestamps and relative phrases such as "3 days ago".
/// Unrecognized input yields `None`.
pub fn parse_posted_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|d| Utc.from_utc_datetime(&d));
    }

    match text.as_str() {
        "just posted" | "just now" | "today" | "now" => return Some(now),
        "yesterday" => return Some(now - Duration::days(1)),
        _ => {}
    }

    parse_relative(&text).map(|ago| now - ago)
}

fn parse_relative(text: &str) -> Option<Duration> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let ago = tokens.iter().position(|t| *t == "ago")?;
    if ago < 2 {
        return None;
    }
    let amount = match tokens[ago - 2] {
        "a" | "an" => 1,
        n => n.trim_end_matches('+').parse::<i64>().ok()?,
    };
    let unit = tokens[ago - 1].trim_end_matches('s');
    let duration = match unit {
        "minute" | "min" => Duration::minutes(amount),
        "hour" | "hr" => Duration::hours(amount),
        "day" => Duration::days(amount),
        "week" => Duration::weeks(amount),
        "month" => Duration::days(30 * amount),
        _ => return None,
    };
    Some(duration)
}

/// Maps provider employment-type codes ("FULLTIME", "FULL_TIME", "Part-time")
/// onto display labels. Unknown codes pass through.
pub fn employment_type_label(raw: &str) -> String {
    let code: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    match code.as_str() {
        "FULLTIME" => "Full-time".to_string(),
        "PARTTIME" => "Part-time".to_string(),
        "CONTRACT" | "CONTRACTOR" => "Contract".to_string(),
        "TEMPORARY" | "TEMP" => "Temporary".to_string(),
        "INTERN" | "INTERNSHIP" => "Internship".to_string(),
        "VOLUNTEER" => "Volunteer".to_string(),
        _ => raw.trim().to_string(),
    }
}

/// Classifies and assembles canonical jobs. Postings without a native id or
/// a title are dropped; at most `count` jobs are returned.
pub fn canonicalize(
    provider: &str,
    postings: impl IntoIterator<Item = RawPosting>,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<CanonicalJob> {
    postings
        .into_iter()
        .filter(|p| {
            let keep = !p.native_id.trim().is_empty() && !p.title.trim().is_empty();
            if !keep {
                debug!("{provider}: skipping posting without id or title");
            }
            keep
        })
        .take(count)
        .map(|p| to_canonical(provider, p, now))
        .collect()
}

fn to_canonical(provider: &str, p: RawPosting, now: DateTime<Utc>) -> CanonicalJob {
    let url = resolve_url(
        p.apply_url.as_deref(),
        p.related_url.as_deref(),
        &p.title,
        &p.company,
        &p.location,
    );
    let is_remote = detect_remote(p.remote_flag, &p.title, &p.location, &p.description);
    let job_type = p
        .job_type
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_JOB_TYPE.to_string());

    CanonicalJob {
        job_id: qualified_job_id(provider, p.native_id.trim()),
        region: classify_region(&p.location),
        experience_level: detect_experience_level(&p.title, &p.description),
        required_skills: extract_skills(&p.description),
        title: p.title.trim().to_string(),
        company: p.company.trim().to_string(),
        location: p.location.trim().to_string(),
        job_type,
        description: p.description,
        salary: p.salary,
        is_remote,
        url,
        source: provider.to_string(),
        posted_date: p.posted_at,
        fetched_at: now,
    }
}
