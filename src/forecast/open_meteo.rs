//! Open-Meteo forecast client.
//!
//! API: `https://api.open-meteo.com/v1/forecast`
//! Auth: None required.
//! Hourly variables are requested by repeating the `hourly` parameter.
//! With `timezone=auto` timestamps come back as naive local times.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::ForecastSource;
use crate::types::{ForecastRequest, HourlySeries, IngestError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Bounded wait for the whole request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    timezone: Option<String>,
    hourly: HourlySeries,
}

/// Body Open-Meteo sends with 4xx responses.
#[derive(Debug, Deserialize)]
struct OpenMeteoErrorBody {
    reason: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    base_url: String,
}

impl OpenMeteoClient {
    /// Client against the public endpoint with the default timeout.
    pub fn new() -> Result<Self, IngestError> {
        Self::with_endpoint(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_endpoint(base_url: &str, timeout: Duration) -> Result<Self, IngestError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("meteo-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn fetch_hourly(&self, request: &ForecastRequest) -> Result<HourlySeries, IngestError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, e))?;

        let status = resp.status();
        info!(status = %status, url = %self.base_url, "Open-Meteo responded");

        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(&self.base_url, e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<OpenMeteoErrorBody>(&body)
                .map(|b| b.reason)
                .unwrap_or_else(|_| truncate_body(&body));
            return Err(IngestError::Network(format!(
                "Open-Meteo returned {status}: {detail}"
            )));
        }

        let parsed: OpenMeteoResponse = serde_json::from_str(&body)
            .map_err(|e| IngestError::DataFormat(format!("unexpected Open-Meteo response: {e}")))?;

        debug!(
            timezone = parsed.timezone.as_deref().unwrap_or("?"),
            hours = parsed.hourly.time.len(),
            "Parsed hourly forecast"
        );

        Ok(parsed.hourly)
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> IngestError {
    if e.is_timeout() {
        IngestError::Network(format!("request to {url} timed out: {e}"))
    } else {
        IngestError::Network(format!("request to {url} failed: {e}"))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
