//! Test doubles shared by the integration tests.
//!
//! - `MemorySink`: an append-only in-memory table.
//! - `mock_api`: a local axum server standing in for Open-Meteo.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meteo_ingest::storage::WeatherSink;
use meteo_ingest::types::{IngestError, WeatherRow};

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

/// Append-only table kept in memory. Clones share the same rows.
#[derive(Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<WeatherRow>>>,
    batches: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<WeatherRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn batches(&self) -> usize {
        *self.batches.lock().unwrap()
    }
}

#[async_trait]
impl WeatherSink for MemorySink {
    async fn append(&self, rows: &[WeatherRow]) -> Result<u64, IngestError> {
        self.rows.lock().unwrap().extend_from_slice(rows);
        *self.batches.lock().unwrap() += 1;
        Ok(rows.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Mock Open-Meteo endpoint
// ---------------------------------------------------------------------------

/// What the mock endpoint answers with.
#[derive(Clone)]
pub enum MockResponse {
    Json(Value),
    Status(StatusCode, String),
    /// Answer with the JSON only after the delay.
    Slow(Duration, Value),
}

struct ApiState {
    response: MockResponse,
    queries: Mutex<Vec<String>>,
}

pub struct MockApi {
    pub url: String,
    state: Arc<ApiState>,
}

impl MockApi {
    /// Raw query strings received so far.
    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().unwrap().clone()
    }
}

async fn forecast_handler(State(state): State<Arc<ApiState>>, RawQuery(query): RawQuery) -> Response {
    state.queries.lock().unwrap().push(query.unwrap_or_default());
    match &state.response {
        MockResponse::Json(body) => Json(body.clone()).into_response(),
        MockResponse::Status(code, body) => (*code, body.clone()).into_response(),
        MockResponse::Slow(delay, body) => {
            tokio::time::sleep(*delay).await;
            Json(body.clone()).into_response()
        }
    }
}

/// Serve `response` on `GET /v1/forecast` from an ephemeral local port.
pub async fn mock_api(response: MockResponse) -> MockApi {
    let state = Arc::new(ApiState {
        response,
        queries: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/v1/forecast", get(forecast_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApi {
        url: format!("http://{addr}/v1/forecast"),
        state,
    }
}

/// URL of a port nothing listens on.
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1/forecast")
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A forecast body shaped like Open-Meteo's, `hours` entries per field.
pub fn forecast_body(hours: usize) -> Value {
    let codes = [0, 1, 2, 3, 45, 61, 63, 71, 95, 42];
    json!({
        "latitude": 55.75,
        "longitude": 37.625,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 10800,
        "timezone": "Europe/Moscow",
        "timezone_abbreviation": "MSK",
        "elevation": 144.0,
        "hourly_units": {
            "time": "iso8601",
            "temperature_2m": "°C",
            "relativehumidity_2m": "%",
            "apparent_temperature": "°C",
            "precipitation_probability": "%",
            "windspeed_10m": "km/h",
            "weathercode": "wmo code"
        },
        "hourly": {
            "time": (0..hours).map(|h| format!("2024-04-15T{:02}:00", h % 24)).collect::<Vec<_>>(),
            "temperature_2m": (0..hours).map(|h| 4.0 + h as f64 * 0.3).collect::<Vec<_>>(),
            "relativehumidity_2m": (0..hours).map(|h| 60 + (h % 30) as i64).collect::<Vec<_>>(),
            "apparent_temperature": (0..hours).map(|h| 1.5 + h as f64 * 0.3).collect::<Vec<_>>(),
            "precipitation_probability": (0..hours).map(|h| (h * 3 % 100) as i64).collect::<Vec<_>>(),
            "windspeed_10m": (0..hours).map(|h| 10.0 + (h % 5) as f64).collect::<Vec<_>>(),
            "weathercode": (0..hours).map(|h| codes[h % codes.len()]).collect::<Vec<_>>()
        }
    })
}
