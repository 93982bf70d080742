//! PostgreSQL sink.
//!
//! Opens a fresh connection per batch (no pool: the job runs once per tick
//! and exits) and writes the batch with a single multi-row INSERT. The
//! destination table must already exist; see `sql/weather.sql`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::WeatherSink;
use crate::types::{IngestError, WeatherRow};

/// Destination columns, in bind order.
pub const COLUMNS: [&str; 10] = [
    "timestamp",
    "temperature_c",
    "feels_like_c",
    "humidity_percent",
    "precip_probability",
    "wind_speed_kmh",
    "weather_code",
    "weather_description",
    "sys_time",
    "dag_id",
];

/// PostgreSQL accepts at most 65535 bind parameters per statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Largest batch that still fits in one statement.
pub const MAX_ROWS_PER_INSERT: usize = MAX_BIND_PARAMS / COLUMNS.len();

/// True for `[A-Za-z_][A-Za-z0-9_]*`, the only identifiers we splice into SQL.
pub fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct PgWeatherSink {
    url: SecretString,
    schema: String,
    table: String,
}

impl PgWeatherSink {
    pub fn new(url: SecretString, schema: &str, table: &str) -> Result<Self, IngestError> {
        for ident in [schema, table] {
            if !is_plain_identifier(ident) {
                return Err(IngestError::Config(format!(
                    "invalid SQL identifier {ident:?}"
                )));
            }
        }
        Ok(Self {
            url,
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// `"schema"."table"`.
    pub fn qualified_table(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.table)
    }
}

/// Build the multi-row INSERT for `rows`.
pub(crate) fn insert_statement<'a>(table: &str, rows: &'a [WeatherRow]) -> QueryBuilder<'a, Postgres> {
    let columns = COLUMNS
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("INSERT INTO {table} ({columns}) "));
    qb.push_values(rows, |mut b, row| {
        b.push_bind(row.timestamp)
            .push_bind(row.temperature_c)
            .push_bind(row.feels_like_c)
            .push_bind(row.humidity_percent)
            .push_bind(row.precip_probability)
            .push_bind(row.wind_speed_kmh)
            .push_bind(row.weather_code)
            .push_bind(row.weather_description.as_str())
            .push_bind(row.sys_time.as_str())
            .push_bind(row.dag_id.as_str());
    });
    qb
}

#[async_trait]
impl WeatherSink for PgWeatherSink {
    async fn append(&self, rows: &[WeatherRow]) -> Result<u64, IngestError> {
        if rows.is_empty() {
            debug!("Empty batch, nothing to insert");
            return Ok(0);
        }
        if rows.len() > MAX_ROWS_PER_INSERT {
            return Err(IngestError::Storage(format!(
                "batch of {} rows exceeds the single-statement limit of {MAX_ROWS_PER_INSERT}",
                rows.len()
            )));
        }

        let mut conn = PgConnection::connect(self.url.expose_secret())
            .await
            .map_err(|e| IngestError::Storage(format!("failed to connect to PostgreSQL: {e}")))?;

        let table = self.qualified_table();
        let mut qb = insert_statement(&table, rows);
        let result = qb
            .build()
            .execute(&mut conn)
            .await
            .map_err(|e| IngestError::Storage(format!("insert into {table} failed: {e}")))?;

        // Rows are committed at this point; a failed close only leaks the socket.
        if let Err(e) = conn.close().await {
            debug!(error = %e, "Failed to close PostgreSQL connection cleanly");
        }

        let written = result.rows_affected();
        info!(table = %table, rows = written, "Batch appended");
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
