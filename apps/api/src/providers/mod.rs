//! Provider Adapters: one per external job source.
//!
//! Each adapter builds its provider-specific request, maps the provider's
//! failure signals onto `ProviderError`, and normalizes raw postings into
//! `CanonicalJob` records. The scraper only ever sees `Arc<dyn JobProvider>`.

pub mod google_jobs;
pub mod http;
pub mod jsearch;
pub mod linkedin;
pub mod normalize;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::{ProviderConfig, ProviderKind};
use crate::models::job::CanonicalJob;

pub use google_jobs::GoogleJobsAdapter;
pub use jsearch::JSearchAdapter;
pub use linkedin::LinkedInAdapter;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the call because the credential's quota is spent.
    #[error("{provider}: quota exceeded ({detail})")]
    QuotaExceeded { provider: String, detail: String },

    /// Network failure, timeout or a 5xx. Transient.
    #[error("{provider}: unavailable ({detail})")]
    Unavailable {
        provider: String,
        detail: String,
        reached_remote: bool,
    },

    /// The provider answered with something the adapter cannot normalize.
    #[error("{provider}: malformed response ({detail})")]
    MalformedResponse { provider: String, detail: String },
}

impl ProviderError {
    /// Whether the request got to the provider, and so consumed quota.
    pub fn reached_remote(&self) -> bool {
        match self {
            ProviderError::QuotaExceeded { .. } => true,
            ProviderError::Unavailable { reached_remote, .. } => *reached_remote,
            ProviderError::MalformedResponse { .. } => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::QuotaExceeded { .. } => "quota_exceeded",
            ProviderError::Unavailable { .. } => "unavailable",
            ProviderError::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// A single external job source.
#[async_trait]
pub trait JobProvider: Send + Sync {
    fn config(&self) -> &ProviderConfig;

    /// Fetches up to `count` postings for `query` near `location`.
    async fn search(
        &self,
        query: &str,
        location: &str,
        count: usize,
    ) -> Result<Vec<CanonicalJob>, ProviderError>;
}

/// Instantiates the adapter matching each configured provider kind, keeping
/// the configs' priority order.
pub fn build_providers(
    configs: &[ProviderConfig],
    timeout: Duration,
    clock: Arc<dyn Clock>,
) -> Result<Vec<Arc<dyn JobProvider>>> {
    let client = http::build_client(timeout)?;
    let providers = configs
        .iter()
        .cloned()
        .map(|config| -> Arc<dyn JobProvider> {
            match config.kind {
                ProviderKind::GoogleJobs => {
                    Arc::new(GoogleJobsAdapter::new(config, client.clone(), clock.clone()))
                }
                ProviderKind::LinkedIn => {
                    Arc::new(LinkedInAdapter::new(config, client.clone(), clock.clone()))
                }
                ProviderKind::JSearch => {
                    Arc::new(JSearchAdapter::new(config, client.clone(), clock.clone()))
                }
            }
        })
        .collect();
    Ok(providers)
}
