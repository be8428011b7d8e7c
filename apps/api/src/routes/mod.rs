pub mod health;
pub mod jobs;
pub mod operations;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route("/api/v1/jobs/search", get(jobs::handle_search))
        .route("/api/v1/jobs/:job_id", get(jobs::handle_get_job))
        .route("/api/v1/matches", post(jobs::handle_match))
        // Operations
        .route("/api/v1/cycle", post(operations::handle_run_cycle))
        .route("/api/v1/budget", get(operations::handle_budget))
        .with_state(state)
}
