use std::collections::BTreeMap;

use axum::{extract::State, Json};
use chrono::{Datelike, Weekday};
use serde::Deserialize;

use crate::budget::BudgetStatus;
use crate::errors::AppError;
use crate::scheduler::CycleReport;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CycleRequest {
    /// "monday", "Tue", ... Defaults to today's weekday (UTC).
    pub weekday: Option<String>,
}

/// POST /api/v1/cycle
pub async fn handle_run_cycle(
    State(state): State<AppState>,
    body: Option<Json<CycleRequest>>,
) -> Result<Json<CycleReport>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let weekday = match request.weekday.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<Weekday>()
            .map_err(|_| AppError::Validation(format!("Unknown weekday '{raw}'")))?,
        _ => state.clock.now().weekday(),
    };

    Ok(Json(state.scheduler.run_daily_cycle(weekday).await))
}

/// GET /api/v1/budget
pub async fn handle_budget(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, BudgetStatus>>, AppError> {
    Ok(Json(state.engine.budget_status().await?))
}
