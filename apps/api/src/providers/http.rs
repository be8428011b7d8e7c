//! Shared HTTP plumbing for the adapters: client construction, status
//! mapping and body decoding.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::providers::ProviderError;

/// Body phrases some providers use on 401/403 when the plan is spent.
const QUOTA_PHRASES: &[&str] = &["quota", "limit", "exceeded"];

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("jobpulse-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build provider HTTP client")
}

/// Maps a non-success status onto the provider error taxonomy.
/// Returns `None` for 2xx.
pub fn classify_status(provider: &str, status: StatusCode, body: &str) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }

    let detail = format!("HTTP {}: {}", status.as_u16(), snippet(body));

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(ProviderError::QuotaExceeded {
            provider: provider.to_string(),
            detail,
        });
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        let lowered = body.to_lowercase();
        if QUOTA_PHRASES.iter().any(|p| lowered.contains(p)) {
            return Some(ProviderError::QuotaExceeded {
                provider: provider.to_string(),
                detail,
            });
        }
    }

    Some(ProviderError::Unavailable {
        provider: provider.to_string(),
        detail,
        reached_remote: true,
    })
}

/// RapidAPI-hosted providers expect the key plus the API's host name.
pub fn with_rapidapi_auth(request: RequestBuilder, endpoint: &str, api_key: &str) -> RequestBuilder {
    let host = Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    request
        .header("X-RapidAPI-Key", api_key)
        .header("X-RapidAPI-Host", host)
}

/// Maps a transport failure. Only connection-level failures are known not
/// to have reached the provider.
pub fn transport_error(provider: &str, err: reqwest::Error) -> ProviderError {
    let reached_remote = !(err.is_connect() || err.is_builder());
    ProviderError::Unavailable {
        provider: provider.to_string(),
        detail: err.to_string(),
        reached_remote,
    }
}

/// Sends the request and decodes a JSON body, mapping every failure mode.
pub async fn fetch_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if let Some(err) = classify_status(provider, status, &body) {
        return Err(err);
    }

    debug!("{provider} answered {} ({} bytes)", status.as_u16(), body.len());
    decode_body(provider, &body)
}

pub fn decode_body<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::MalformedResponse {
        provider: provider.to_string(),
        detail: e.to_string(),
    })
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
