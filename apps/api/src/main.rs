mod budget;
mod cache;
mod clock;
mod config;
mod db;
mod engine;
mod errors;
mod matching;
mod models;
mod providers;
mod routes;
mod scheduler;
mod scraper;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::budget::{BudgetGovernor, InMemoryQuotaLedger, PgQuotaLedger, QuotaLedger};
use crate::cache::{InMemoryResponseCache, RedisResponseCache, ResponseCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::create_pool;
use crate::engine::JobEngine;
use crate::providers::build_providers;
use crate::routes::build_router;
use crate::scheduler::DailyStrategyScheduler;
use crate::scraper::FallbackScraper;
use crate::state::AppState;
use crate::store::{InMemoryJobStore, JobStore, PgJobStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobPulse API v{}", env!("CARGO_PKG_VERSION"));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Job Store and Quota Ledger: Postgres when configured, in-process otherwise
    let (store, ledger): (Arc<dyn JobStore>, Arc<dyn QuotaLedger>) = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            (
                Arc::new(PgJobStore::new(pool.clone())),
                Arc::new(PgQuotaLedger::new(pool)),
            )
        }
        None => {
            info!("DATABASE_URL not set, using in-memory job store and quota ledger");
            (
                Arc::new(InMemoryJobStore::new()),
                Arc::new(InMemoryQuotaLedger::new()),
            )
        }
    };

    // Response Cache
    let cache: Arc<dyn ResponseCache> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis response cache initialized");
            Arc::new(RedisResponseCache::new(client, clock.clone()))
        }
        None => Arc::new(InMemoryResponseCache::new(
            clock.clone(),
            config.cache_max_entries,
        )),
    };

    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let providers = build_providers(&config.providers, timeout, clock.clone())?;
    if providers.is_empty() {
        info!("No provider API keys configured, searches will serve the fallback dataset");
    } else {
        let names: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
        info!("Providers enabled (by priority): {}", names.join(", "));
    }

    let governor = Arc::new(BudgetGovernor::new(ledger, clock.clone()));
    let scraper = Arc::new(FallbackScraper::new(
        providers,
        governor,
        cache,
        clock.clone(),
        timeout,
    ));

    let engine = Arc::new(JobEngine::new(
        scraper.clone(),
        store.clone(),
        clock.clone(),
        config.match_pool_size,
    ));
    let scheduler = Arc::new(DailyStrategyScheduler::new(
        scraper,
        store,
        clock.clone(),
        Duration::from_secs(config.scheduler_delay_secs),
        config.job_retention_days,
    ));

    let state = AppState {
        engine,
        scheduler,
        clock,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
