//! Column-to-row reshaping of an hourly series.

use chrono::NaiveDateTime;

use super::weather_codes;
use crate::types::{HourlySeries, IngestError, RunContext, WeatherRow};

/// Timestamp layout Open-Meteo uses for hourly data.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse one hourly timestamp. Seconds are accepted too.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, IngestError> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| IngestError::DataFormat(format!("invalid timestamp {raw:?}: {e}")))
}

/// Turn the column-oriented series into one row per hour, stamped with
/// the run's ingestion time and id.
///
/// All sequences must have the length of `time`; otherwise nothing is
/// produced.
pub fn build_rows(series: &HourlySeries, ctx: &RunContext) -> Result<Vec<WeatherRow>, IngestError> {
    let expected = series.time.len();
    if let Some((name, len)) = series.lengths().into_iter().find(|(_, len)| *len != expected) {
        return Err(IngestError::DataFormat(format!(
            "hourly field '{name}' has {len} values, expected {expected} (one per timestamp)"
        )));
    }

    let sys_time = ctx.sys_time();
    let dag_id = ctx.run_id.to_string();

    series
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let code = series.weathercode[i];
            Ok(WeatherRow {
                timestamp: parse_timestamp(raw)?,
                temperature_c: series.temperature_2m[i],
                feels_like_c: series.apparent_temperature[i],
                humidity_percent: series.relativehumidity_2m[i],
                precip_probability: series.precipitation_probability[i],
                wind_speed_kmh: series.windspeed_10m[i],
                weather_code: code,
                weather_description: weather_codes::describe_opt(code).to_string(),
                sys_time: sys_time.clone(),
                dag_id: dag_id.clone(),
            })
        })
        .collect()
}
