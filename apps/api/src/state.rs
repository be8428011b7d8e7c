use std::sync::Arc;

use crate::clock::Clock;
use crate::engine::JobEngine;
use crate::scheduler::DailyStrategyScheduler;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<JobEngine>,
    pub scheduler: Arc<DailyStrategyScheduler>,
    /// Decides "today" when a cycle request names no weekday.
    pub clock: Arc<dyn Clock>,
}
