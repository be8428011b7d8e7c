use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::{CandidateProfile, MatchResult};
use crate::models::job::CanonicalJob;
use crate::scraper::SearchOutcome;
use crate::state::AppState;

pub const DEFAULT_SEARCH_COUNT: usize = 10;
pub const MAX_SEARCH_COUNT: usize = 100;
pub const DEFAULT_MATCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub location: String,
    pub count: Option<usize>,
}

/// Numeric fields are range-checked in the handler.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub profile: CandidateProfile,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
}

impl MatchRequest {
    fn min_score(&self) -> Result<u8, AppError> {
        match self.min_score {
            None => Ok(0),
            Some(score) if (0.0..=100.0).contains(&score) && score.fract() == 0.0 => {
                Ok(score as u8)
            }
            Some(score) => Err(AppError::Validation(format!(
                "min_score must be an integer between 0 and 100, got {score}"
            ))),
        }
    }

    fn limit(&self) -> Result<usize, AppError> {
        match self.limit {
            None => Ok(DEFAULT_MATCH_LIMIT),
            Some(limit) if limit >= 1 => Ok(usize::try_from(limit).unwrap_or(usize::MAX)),
            Some(limit) => Err(AppError::Validation(format!(
                "limit must be at least 1, got {limit}"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub total: usize,
    pub matches: Vec<MatchResult>,
}

/// GET /api/v1/jobs/search
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>, AppError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    let count = params
        .count
        .unwrap_or(DEFAULT_SEARCH_COUNT)
        .clamp(1, MAX_SEARCH_COUNT);

    let outcome = state
        .engine
        .search_jobs(query, params.location.trim(), count)
        .await;
    Ok(Json(outcome))
}

/// GET /api/v1/jobs/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<CanonicalJob>, AppError> {
    Ok(Json(state.engine.get_job(&job_id).await?))
}

/// POST /api/v1/matches
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let min_score = req.min_score()?;
    let limit = req.limit()?;
    let matches = state
        .engine
        .match_candidate(&req.profile, min_score, limit)
        .await?;
    Ok(Json(MatchResponse {
        total: matches.len(),
        matches,
    }))
}
