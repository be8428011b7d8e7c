use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Coarse geographic bucket derived from free-text location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "MENA")]
    Mena,
    #[serde(rename = "Sub-Saharan-Africa")]
    SubSaharanAfrica,
    #[default]
    Other,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Mena => "MENA",
            Region::SubSaharanAfrica => "Sub-Saharan-Africa",
            Region::Other => "Other",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MENA" => Ok(Region::Mena),
            "Sub-Saharan-Africa" => Ok(Region::SubSaharanAfrica),
            "Other" => Ok(Region::Other),
            other => Err(format!("unknown region '{other}'")),
        }
    }
}

/// Seniority ladder. `Unknown` sits outside the ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
    Lead,
    Executive,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl ExperienceLevel {
    /// Ordinal position on the ladder, `None` for `Unknown`.
    pub fn rank(&self) -> Option<u8> {
        match self {
            ExperienceLevel::Junior => Some(0),
            ExperienceLevel::Mid => Some(1),
            ExperienceLevel::Senior => Some(2),
            ExperienceLevel::Lead => Some(3),
            ExperienceLevel::Executive => Some(4),
            ExperienceLevel::Unknown => None,
        }
    }

    /// Maps years of experience onto the ladder.
    pub fn from_years(years: f64) -> Self {
        match years {
            y if y < 2.0 => ExperienceLevel::Junior,
            y if y < 5.0 => ExperienceLevel::Mid,
            y if y < 8.0 => ExperienceLevel::Senior,
            y if y < 12.0 => ExperienceLevel::Lead,
            _ => ExperienceLevel::Executive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "Junior",
            ExperienceLevel::Mid => "Mid",
            ExperienceLevel::Senior => "Senior",
            ExperienceLevel::Lead => "Lead",
            ExperienceLevel::Executive => "Executive",
            ExperienceLevel::Unknown => "unknown",
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    /// Accepts the level names case-insensitively plus a few common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "junior" | "entry" | "entry level" | "intern" | "graduate" => Ok(ExperienceLevel::Junior),
            "mid" | "mid-level" | "mid level" | "intermediate" => Ok(ExperienceLevel::Mid),
            "senior" | "sr" => Ok(ExperienceLevel::Senior),
            "lead" | "principal" | "staff" => Ok(ExperienceLevel::Lead),
            "executive" | "director" | "head" => Ok(ExperienceLevel::Executive),
            "unknown" | "" => Ok(ExperienceLevel::Unknown),
            other => Err(format!("unknown experience level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
}

/// Provider-agnostic job record. `job_id` is `{provider}_{native_id}` and is the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalJob {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub region: Region,
    pub job_type: String,
    pub experience_level: ExperienceLevel,
    pub description: String,
    pub required_skills: Vec<String>,
    pub salary: Option<SalaryRange>,
    pub is_remote: bool,
    pub url: String,
    pub source: String,
    pub posted_date: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

pub const DEFAULT_JOB_TYPE: &str = "Full-time";

/// Builds the provider-qualified identifier.
pub fn qualified_job_id(provider: &str, native_id: &str) -> String {
    format!("{provider}_{native_id}")
}

impl CanonicalJob {
    /// Date used for retention and recency ordering.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.posted_date.unwrap_or(self.fetched_at)
    }
}

/// Row shape of the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub region: String,
    pub job_type: String,
    pub experience_level: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub is_remote: bool,
    pub url: String,
    pub source: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for CanonicalJob {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let salary = if row.salary_min.is_some() || row.salary_max.is_some() {
            Some(SalaryRange {
                min: row.salary_min,
                max: row.salary_max,
                currency: row.salary_currency,
            })
        } else {
            None
        };

        Ok(CanonicalJob {
            region: row.region.parse()?,
            experience_level: row.experience_level.parse()?,
            job_id: row.job_id,
            title: row.title,
            company: row.company,
            location: row.location,
            job_type: row.job_type,
            description: row.description,
            required_skills: row.required_skills,
            salary,
            is_remote: row.is_remote,
            url: row.url,
            source: row.source,
            posted_date: row.posted_at,
            fetched_at: row.fetched_at,
        })
    }
}
