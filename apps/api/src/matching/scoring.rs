//! Component scores, each an integer in 0..=100, and their weighted sum.

use serde::{Deserialize, Serialize};

use crate::models::job::{CanonicalJob, ExperienceLevel, Region};
use crate::store::classify::{classify_region, find_term, normalize_text};

/// Points lost per ordinal step between candidate and job seniority.
pub const EXPERIENCE_STEP_PENALTY: u32 = 25;
/// Experience score when either side's level is unknown.
pub const UNKNOWN_EXPERIENCE_SCORE: u8 = 50;
pub const SAME_REGION_SCORE: u8 = 50;

/// Minimum length for a candidate skill to match as a substring.
const MIN_SUBSTRING_LEN: usize = 3;

const ANYWHERE_PREFERENCES: &[&str] = &["", "anywhere", "remote", "any", "worldwide", "global"];

/// Preferences that name a whole region rather than a place in it.
const REGION_WIDE_TERMS: &[&str] = &[
    "mena",
    "middle east",
    "north africa",
    "middle east and north africa",
    "gcc",
    "gulf",
    "africa",
    "sub-saharan",
    "sub saharan",
    "sub-saharan africa",
    "sub saharan africa",
    "ssa",
];

/// Words that appear in many place names and identify none of them alone.
const GENERIC_PLACE_WORDS: &[&str] = &[
    "united", "new", "city", "north", "south", "east", "west", "central", "africa", "state",
    "states", "republic", "kingdom", "region", "province", "the", "of", "and", "remote", "hybrid",
    "on-site", "onsite",
];

/// Title words that say nothing about the work itself.
const GENERIC_TITLE_WORDS: &[&str] = &[
    "developer", "engineer", "programmer", "specialist", "associate", "consultant", "senior",
    "junior", "mid", "level", "entry", "lead", "principal", "staff", "head", "intern", "sr", "jr",
    "i", "ii", "iii", "iv", "and", "or", "of", "the", "for", "with", "in", "at", "a", "an", "to",
    "remote", "hybrid",
];

/// Weights in percent. They sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill: u32,
    pub experience: u32,
    pub location: u32,
    pub title: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill: 50,
            experience: 25,
            location: 15,
            title: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentScores {
    pub skill: u8,
    pub experience: u8,
    pub location: u8,
    pub title: u8,
}

/// `round(Σ weight·score / 100)`, half rounding up.
pub fn combine(scores: &ComponentScores, weights: &ScoringWeights) -> u8 {
    let total = weights.skill * u32::from(scores.skill)
        + weights.experience * u32::from(scores.experience)
        + weights.location * u32::from(scores.location)
        + weights.title * u32::from(scores.title);
    ((total + 50) / 100).min(100) as u8
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)).min(100) as u8
}

// ────────────────────────────────────────────────────────────────────────────
// Skills
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillOverlap {
    pub score: u8,
    /// Job skills covered by the candidate, in job order.
    pub matched: Vec<String>,
    /// Job skills the candidate lacks, in job order.
    pub missing: Vec<String>,
}

/// Exact match, candidate skill inside the job skill, or a shared token.
fn skill_matches(candidate: &str, job_skill: &str) -> bool {
    if candidate == job_skill {
        return true;
    }
    if candidate.len() >= MIN_SUBSTRING_LEN && job_skill.contains(candidate) {
        return true;
    }
    normalize_text(job_skill)
        .split_whitespace()
        .any(|token| token == candidate)
}

/// Overlap normalized against the union of both skill sets.
/// Both inputs are expected lowercase.
pub fn skill_overlap(candidate: &[String], job: &[String]) -> SkillOverlap {
    let (matched, missing): (Vec<&String>, Vec<&String>) = job
        .iter()
        .partition(|js| candidate.iter().any(|c| skill_matches(c, &js.to_lowercase())));

    let candidates_used = candidate
        .iter()
        .filter(|c| job.iter().any(|js| skill_matches(c, &js.to_lowercase())))
        .count();
    let intersection = matched.len().min(candidates_used);
    let union = candidate.len() + job.len() - intersection;

    SkillOverlap {
        score: percent(intersection, union),
        matched: matched.into_iter().cloned().collect(),
        missing: missing.into_iter().cloned().collect(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Experience
// ────────────────────────────────────────────────────────────────────────────

pub fn experience_score(candidate: ExperienceLevel, job: ExperienceLevel) -> u8 {
    match (candidate.rank(), job.rank()) {
        (Some(c), Some(j)) => {
            let penalty = u32::from(c.abs_diff(j)) * EXPERIENCE_STEP_PENALTY;
            100_u32.saturating_sub(penalty) as u8
        }
        _ => UNKNOWN_EXPERIENCE_SCORE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Location
// ────────────────────────────────────────────────────────────────────────────

/// Comma-separated parts of a location, normalized, minus generic words.
fn place_segments(location: &str) -> Vec<String> {
    location
        .split(|c: char| c == ',' || c == ';' || c == '|')
        .map(|segment| normalize_text(segment).trim().to_string())
        .filter(|segment| segment.len() >= 2 && !GENERIC_PLACE_WORDS.contains(&segment.as_str()))
        .collect()
}

/// A whole place name from one side appears as a phrase in the other.
fn shares_place(preference: &str, job_location: &str) -> bool {
    let pref_norm = normalize_text(preference);
    let job_norm = normalize_text(job_location);
    place_segments(preference)
        .iter()
        .any(|p| find_term(&job_norm, p).is_some())
        || place_segments(job_location)
            .iter()
            .any(|j| find_term(&pref_norm, j).is_some())
}

pub fn location_score(preference: &str, job: &CanonicalJob) -> u8 {
    if job.is_remote {
        return 100;
    }
    let pref = normalize_text(preference);
    let pref = pref.trim();
    if ANYWHERE_PREFERENCES.contains(&pref) {
        return 100;
    }

    if shares_place(preference, &job.location) {
        return 100;
    }

    let pref_region = classify_region(preference);
    if pref_region == Region::Other || pref_region != job.region {
        return 0;
    }
    if REGION_WIDE_TERMS.contains(&pref) {
        100
    } else {
        SAME_REGION_SCORE
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Title
// ────────────────────────────────────────────────────────────────────────────

/// Meaningful words of a title or title signal.
pub fn title_keywords(title: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in normalize_text(title).split_whitespace() {
        if GENERIC_TITLE_WORDS.contains(&token) || token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

fn term_covers(term: &str, keyword: &str) -> bool {
    term == keyword
        || (term.len() >= MIN_SUBSTRING_LEN && keyword.contains(term))
        || (keyword.len() >= MIN_SUBSTRING_LEN && term.contains(keyword))
}

/// Share of the job title's keywords covered by the candidate's terms.
pub fn title_score(job_title: &str, candidate_terms: &[String]) -> u8 {
    let keywords = title_keywords(job_title);
    let covered = keywords
        .iter()
        .filter(|k| candidate_terms.iter().any(|t| term_covers(t, k)))
        .count();
    percent(covered, keywords.len())
}
