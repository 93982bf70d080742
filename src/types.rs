//! Shared types for the ingestion job.
//!
//! The request, the hourly series as delivered by Open-Meteo, the rows
//! written to the destination table, and the error taxonomy. Kept free of
//! I/O so the forecast, engine and storage modules can all depend on it.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Forecast request
// ---------------------------------------------------------------------------

/// Moscow city centre.
pub const DEFAULT_LATITUDE: f64 = 55.7558;
pub const DEFAULT_LONGITUDE: f64 = 37.6173;

/// Hourly variables requested from the API, in request order.
pub const HOURLY_FIELDS: [&str; 6] = [
    "temperature_2m",            // °C at 2 m
    "relativehumidity_2m",       // %
    "apparent_temperature",      // °C
    "precipitation_probability", // %
    "windspeed_10m",             // km/h at 10 m
    "weathercode",               // WMO code
];

/// Parameters of a single forecast query. Identity is the parameter tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Timezone mode; "auto" resolves to the location's local zone.
    pub timezone: String,
    pub forecast_days: u8,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            timezone: "auto".to_string(),
            forecast_days: 1,
        }
    }
}

impl ForecastRequest {
    /// Query pairs in the order the endpoint receives them.
    /// `hourly` is repeated once per requested variable.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
        ];
        pairs.extend(HOURLY_FIELDS.iter().map(|f| ("hourly", f.to_string())));
        pairs.push(("timezone", self.timezone.clone()));
        pairs.push(("forecast_days", self.forecast_days.to_string()));
        pairs
    }
}

// ---------------------------------------------------------------------------
// Hourly series (wire shape)
// ---------------------------------------------------------------------------

/// The `hourly` object of an Open-Meteo forecast response.
///
/// Column-oriented: each field is one ordered sequence, one entry per hour.
/// Lengths are not checked here; see [`crate::engine::transform::build_rows`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    /// Local timestamps, `YYYY-MM-DDTHH:MM`.
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub apparent_temperature: Vec<Option<f64>>,
    #[serde(deserialize_with = "integral_column")]
    pub relativehumidity_2m: Vec<Option<i64>>,
    #[serde(deserialize_with = "integral_column")]
    pub precipitation_probability: Vec<Option<i64>>,
    pub windspeed_10m: Vec<Option<f64>>,
    #[serde(deserialize_with = "integral_column")]
    pub weathercode: Vec<Option<i64>>,
}

/// A JSON number that should hold an integer; some models send `80.0`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireInteger {
    Int(i64),
    Float(f64),
}

/// Integer column that also accepts integral floats. Fractional values
/// are rejected.
fn integral_column<'de, D>(deserializer: D) -> Result<Vec<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Option<WireInteger>>::deserialize(deserializer)?
        .into_iter()
        .map(|value| match value {
            None => Ok(None),
            Some(WireInteger::Int(n)) => Ok(Some(n)),
            Some(WireInteger::Float(f))
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 =>
            {
                Ok(Some(f as i64))
            }
            Some(WireInteger::Float(f)) => Err(<D::Error as de::Error>::custom(format!(
                "expected an integer, got {f}"
            ))),
        })
        .collect()
}

impl HourlySeries {
    /// Length of every sequence, keyed by its wire name.
    pub fn lengths(&self) -> [(&'static str, usize); 7] {
        [
            ("time", self.time.len()),
            ("temperature_2m", self.temperature_2m.len()),
            ("apparent_temperature", self.apparent_temperature.len()),
            ("relativehumidity_2m", self.relativehumidity_2m.len()),
            ("precipitation_probability", self.precipitation_probability.len()),
            ("windspeed_10m", self.windspeed_10m.len()),
            ("weathercode", self.weathercode.len()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// Opaque identifier of one execution of the job, assigned by whatever
/// scheduled it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id for runs started without a scheduler.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the step receives from its invoker.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    /// Wall clock at run start; every row of the batch carries it.
    pub started_at: DateTime<Local>,
}

impl RunContext {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            started_at: Local::now(),
        }
    }

    /// Ingestion stamp as stored in `sys_time`, e.g. `20240131_120000`.
    pub fn sys_time(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// Destination row
// ---------------------------------------------------------------------------

/// One row of `public.weather`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRow {
    /// Hour in the location's local timezone.
    pub timestamp: NaiveDateTime,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub humidity_percent: Option<i64>,
    pub precip_probability: Option<i64>,
    pub wind_speed_kmh: Option<f64>,
    pub weather_code: Option<i64>,
    pub weather_description: String,
    pub sys_time: String,
    pub dag_id: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure of an ingestion run. Every variant aborts the run with nothing
/// written.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Transport failure, timeout, or non-2xx status.
    #[error("API request failed: {0}")]
    Network(String),

    /// Body is not the expected JSON shape.
    #[error("Data processing failed: {0}")]
    DataFormat(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The scheduler's time budget ran out before the step finished.
    #[error("Run timed out: {0}")]
    TimedOut(String),
}

impl IngestError {
    /// Short kind label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Network(_) => "network",
            IngestError::DataFormat(_) => "data_format",
            IngestError::Storage(_) => "storage",
            IngestError::Config(_) => "config",
            IngestError::TimedOut(_) => "timeout",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
