use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::state::AppState;

/// GET /health
/// Returns service status, version and the number of stored jobs.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let stored_jobs = state.engine.stored_job_count().await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobpulse-api",
        "stored_jobs": stored_jobs
    })))
}
