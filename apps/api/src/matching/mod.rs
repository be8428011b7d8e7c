//! Matching Engine: ranks jobs for a candidate profile with fixed-weight,
//! multi-dimensional scoring. Pure and deterministic: identical inputs give
//! identical output, including tie order.

pub mod scoring;

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::{CanonicalJob, ExperienceLevel};
use crate::store::classify::canonical_skill;

use self::scoring::{
    combine, experience_score, location_score, skill_overlap, title_keywords, title_score,
    ComponentScores, ScoringWeights,
};

/// Years of experience or a level name ("Senior", "mid-level", "5").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExperienceInput {
    Years(f64),
    Text(String),
}

/// Candidate profile as supplied by the resume parser.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CandidateProfile {
    pub skills: Vec<String>,
    #[serde(default, alias = "experience")]
    pub experience_level: Option<ExperienceInput>,
    #[serde(default)]
    pub preferred_location: String,
    /// Free-text role the candidate is after, e.g. "Backend Developer".
    #[serde(default)]
    pub title: Option<String>,
}

/// A profile that passed validation, with normalized skills.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProfile {
    pub skills: Vec<String>,
    pub level: ExperienceLevel,
    pub preferred_location: String,
    /// Skills plus title-signal keywords, used for title scoring.
    pub title_terms: Vec<String>,
}

impl CandidateProfile {
    pub fn validate(&self) -> Result<ValidatedProfile, AppError> {
        let mut skills: Vec<String> = Vec::new();
        for raw in &self.skills {
            let trimmed = raw.trim().to_lowercase();
            if trimmed.is_empty() {
                continue;
            }
            let skill = canonical_skill(&trimmed)
                .map(str::to_string)
                .unwrap_or(trimmed);
            if !skills.contains(&skill) {
                skills.push(skill);
            }
        }
        if skills.is_empty() {
            return Err(AppError::Validation(
                "profile.skills must contain at least one non-empty skill".to_string(),
            ));
        }

        let level = match &self.experience_level {
            None => ExperienceLevel::Unknown,
            Some(ExperienceInput::Years(years)) => level_from_years(*years)?,
            Some(ExperienceInput::Text(text)) => match text.trim().parse::<f64>() {
                Ok(years) => level_from_years(years)?,
                Err(_) => text.parse::<ExperienceLevel>().map_err(|_| {
                    AppError::Validation(format!(
                        "profile.experience_level '{text}' is neither a level name nor a number of years"
                    ))
                })?,
            },
        };

        let mut title_terms = skills.clone();
        if let Some(title) = &self.title {
            for keyword in title_keywords(title) {
                if !title_terms.contains(&keyword) {
                    title_terms.push(keyword);
                }
            }
        }

        Ok(ValidatedProfile {
            skills,
            level,
            preferred_location: self.preferred_location.trim().to_string(),
            title_terms,
        })
    }
}

fn level_from_years(years: f64) -> Result<ExperienceLevel, AppError> {
    if !years.is_finite() || years < 0.0 {
        return Err(AppError::Validation(format!(
            "profile.experience_level must be a non-negative number of years, got {years}"
        )));
    }
    Ok(ExperienceLevel::from_years(years))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub job: CanonicalJob,
    pub skill_score: u8,
    pub experience_score: u8,
    pub location_score: u8,
    pub title_score: u8,
    pub overall: u8,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

pub fn score_job(profile: &ValidatedProfile, job: &CanonicalJob, weights: &ScoringWeights) -> MatchResult {
    let job_skills: Vec<String> = job.required_skills.iter().map(|s| s.to_lowercase()).collect();
    let overlap = skill_overlap(&profile.skills, &job_skills);
    let components = ComponentScores {
        skill: overlap.score,
        experience: experience_score(profile.level, job.experience_level),
        location: location_score(&profile.preferred_location, job),
        title: title_score(&job.title, &profile.title_terms),
    };

    MatchResult {
        job: job.clone(),
        skill_score: components.skill,
        experience_score: components.experience,
        location_score: components.location,
        title_score: components.title,
        overall: combine(&components, weights),
        matched_skills: overlap.matched,
        missing_skills: overlap.missing,
    }
}

/// Scores every job, drops those under `min_score`, and ranks the rest:
/// overall desc, posted date desc (undated last), provider priority asc,
/// then `job_id` asc. Sources missing from `priorities` rank last.
pub fn match_jobs(
    profile: &ValidatedProfile,
    jobs: &[CanonicalJob],
    min_score: u8,
    priorities: &HashMap<String, u32>,
) -> Vec<MatchResult> {
    let weights = ScoringWeights::default();
    let mut results: Vec<MatchResult> = jobs
        .iter()
        .map(|job| score_job(profile, job, &weights))
        .filter(|r| r.overall >= min_score)
        .collect();

    let priority = |r: &MatchResult| priorities.get(&r.job.source).copied().unwrap_or(u32::MAX);
    results.sort_by(|a, b| {
        b.overall
            .cmp(&a.overall)
            .then_with(|| newer_first(a, b))
            .then_with(|| priority(a).cmp(&priority(b)))
            .then_with(|| a.job.job_id.cmp(&b.job.job_id))
    });
    results
}

fn newer_first(a: &MatchResult, b: &MatchResult) -> Ordering {
    match (a.job.posted_date, b.job.posted_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::models::job::Region;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap()
    }

    fn job(id: &str, title: &str, skills: &[&str], source: &str, days_ago: Option<i64>) -> CanonicalJob {
        CanonicalJob {
            job_id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Cairo, Egypt".to_string(),
            region: Region::Mena,
            job_type: "Full-time".to_string(),
            experience_level: ExperienceLevel::Mid,
            description: String::new(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            salary: None,
            is_remote: false,
            url: "https://example.test".to_string(),
            source: source.to_string(),
            posted_date: days_ago.map(|d| now() - Duration::days(d)),
            fetched_at: now(),
        }
    }

    fn profile(skills: &[&str], experience: Option<ExperienceInput>, location: &str) -> CandidateProfile {
        CandidateProfile {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_level: experience,
            preferred_location: location.to_string(),
            title: None,
        }
    }

    fn priorities() -> HashMap<String, u32> {
        HashMap::from([
            ("google_jobs".to_string(), 1),
            ("linkedin".to_string(), 2),
            ("jsearch".to_string(), 3),
        ])
    }

    #[test]
    fn test_reference_scenario_scores_75() {
        let candidate = profile(
            &["python", "react", "postgresql"],
            Some(ExperienceInput::Text("Mid".to_string())),
            "Cairo",
        )
        .validate()
        .unwrap();
        let target = job("jsearch_1", "Python Developer", &["python", "react", "docker"], "jsearch", Some(1));

        let results = match_jobs(&candidate, &[target], 0, &priorities());
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.skill_score, 50);
        assert_eq!(r.experience_score, 100);
        assert_eq!(r.location_score, 100);
        assert_eq!(r.title_score, 100);
        assert_eq!(r.overall, 75);
        assert_eq!(r.matched_skills, vec!["python", "react"]);
        assert_eq!(r.missing_skills, vec!["docker"]);
    }

    #[test]
    fn test_min_score_filters() {
        let candidate = profile(&["python"], None, "Cairo").validate().unwrap();
        let jobs = vec![
            job("jsearch_1", "Python Developer", &["python"], "jsearch", Some(1)),
            job("jsearch_2", "Java Developer", &["java", "spring"], "jsearch", Some(1)),
        ];
        let results = match_jobs(&candidate, &jobs, 60, &priorities());
        let ids: Vec<&str> = results.iter().map(|r| r.job.job_id.as_str()).collect();
        assert_eq!(ids, vec!["jsearch_1"]);
    }

    #[test]
    fn test_ties_break_by_date_then_priority_then_id() {
        let candidate = profile(&["python"], None, "Cairo").validate().unwrap();
        let jobs = vec![
            job("jsearch_b", "Python Developer", &["python"], "jsearch", Some(2)),
            job("jsearch_a", "Python Developer", &["python"], "jsearch", Some(2)),
            job("google_jobs_z", "Python Developer", &["python"], "google_jobs", Some(2)),
            job("linkedin_new", "Python Developer", &["python"], "linkedin", Some(1)),
            job("fallback_1", "Python Developer", &["python"], "fallback", Some(2)),
            job("jsearch_undated", "Python Developer", &["python"], "jsearch", None),
        ];
        let results = match_jobs(&candidate, &jobs, 0, &priorities());
        let ids: Vec<&str> = results.iter().map(|r| r.job.job_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "linkedin_new",
                "google_jobs_z",
                "jsearch_a",
                "jsearch_b",
                "fallback_1",
                "jsearch_undated"
            ]
        );
    }

    #[test]
    fn test_matching_is_idempotent_and_bounded() {
        let candidate = profile(
            &["python", "sql", "docker", "communication"],
            Some(ExperienceInput::Years(6.0)),
            "MENA",
        )
        .validate()
        .unwrap();
        let jobs: Vec<CanonicalJob> = crate::scraper::fallback_data::fallback_jobs(now())
            .into_iter()
            .chain([
                job("jsearch_1", "Senior Python Engineer", &["python", "aws"], "jsearch", Some(3)),
                job("linkedin_1", "DevOps Engineer", &["docker", "kubernetes"], "linkedin", None),
            ])
            .collect();

        let first = match_jobs(&candidate, &jobs, 0, &priorities());
        let second = match_jobs(&candidate, &jobs, 0, &priorities());
        assert_eq!(first, second);
        assert_eq!(first.len(), jobs.len());
        for r in &first {
            assert!(r.overall <= 100);
            for component in [r.skill_score, r.experience_score, r.location_score, r.title_score] {
                assert!(component <= 100);
            }
        }
        assert!(first.windows(2).all(|w| w[0].overall >= w[1].overall));
    }

    #[test]
    fn test_validation_requires_a_skill() {
        let err = profile(&["  ", ""], None, "Cairo").validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validation_rejects_unknown_experience_text() {
        let err = profile(&["python"], Some(ExperienceInput::Text("wizard".into())), "")
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = profile(&["python"], Some(ExperienceInput::Years(-1.0)), "")
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validation_normalizes_skills_and_experience() {
        let validated = CandidateProfile {
            skills: vec!["ReactJS".into(), " Python ".into(), "python".into()],
            experience_level: Some(ExperienceInput::Text("7".into())),
            preferred_location: " Lagos ".into(),
            title: Some("Senior Backend Developer".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(validated.skills, vec!["react", "python"]);
        assert_eq!(validated.level, ExperienceLevel::Senior);
        assert_eq!(validated.preferred_location, "Lagos");
        assert_eq!(validated.title_terms, vec!["react", "python", "backend"]);
    }

    #[test]
    fn test_profile_deserializes_years_or_level() {
        let years: CandidateProfile =
            serde_json::from_str(r#"{"skills":["go"],"experience_level":3}"#).unwrap();
        assert_eq!(years.experience_level, Some(ExperienceInput::Years(3.0)));
        let level: CandidateProfile =
            serde_json::from_str(r#"{"skills":["go"],"experience":"Lead"}"#).unwrap();
        assert_eq!(level.experience_level, Some(ExperienceInput::Text("Lead".into())));
    }
}
