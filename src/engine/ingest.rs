//! The ingestion step.
//!
//! One call to [`IngestStep::run`] is one run of the job: a single forecast
//! request, a single transform, a single batch append. Any failure aborts
//! the run before the append, so a failed run writes nothing. The step never
//! retries; that is the scheduler's decision.

use tracing::{error, info};

use super::transform;
use crate::config::AppConfig;
use crate::forecast::open_meteo::OpenMeteoClient;
use crate::forecast::ForecastSource;
use crate::storage::postgres::PgWeatherSink;
use crate::storage::WeatherSink;
use crate::types::{ForecastRequest, IngestError, RunContext, RunId};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub run_id: RunId,
    /// Hourly timestamps returned by the endpoint.
    pub hours: usize,
    pub rows_written: u64,
    pub sys_time: String,
}

pub struct IngestStep {
    source: Box<dyn ForecastSource>,
    sink: Box<dyn WeatherSink>,
    request: ForecastRequest,
}

impl IngestStep {
    pub fn new(
        source: Box<dyn ForecastSource>,
        sink: Box<dyn WeatherSink>,
        request: ForecastRequest,
    ) -> Self {
        Self {
            source,
            sink,
            request,
        }
    }

    /// Open-Meteo client and PostgreSQL sink as configured.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, IngestError> {
        let source = OpenMeteoClient::with_endpoint(&cfg.forecast.base_url, cfg.forecast.timeout())?;
        let sink = PgWeatherSink::new(
            cfg.database.resolve_url(),
            &cfg.database.schema,
            &cfg.database.table,
        )?;
        Ok(Self::new(Box::new(source), Box::new(sink), cfg.forecast.request()))
    }

    pub fn request(&self) -> &ForecastRequest {
        &self.request
    }

    /// Run the step once. Errors are logged here and returned unchanged.
    pub async fn run(&self, ctx: &RunContext) -> Result<IngestReport, IngestError> {
        info!(
            run_id = %ctx.run_id,
            latitude = self.request.latitude,
            longitude = self.request.longitude,
            forecast_days = self.request.forecast_days,
            "Starting ingestion run"
        );

        match self.execute(ctx).await {
            Ok(report) => {
                info!(
                    run_id = %report.run_id,
                    hours = report.hours,
                    rows = report.rows_written,
                    sys_time = %report.sys_time,
                    "Ingestion run complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(run_id = %ctx.run_id, kind = e.kind(), error = %e, "Ingestion run failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, ctx: &RunContext) -> Result<IngestReport, IngestError> {
        let series = self.source.fetch_hourly(&self.request).await?;
        let hours = series.time.len();
        info!(hours, "Hourly forecast received");

        let rows = transform::build_rows(&series, ctx)?;
        let rows_written = self.sink.append(&rows).await?;

        Ok(IngestReport {
            run_id: ctx.run_id.clone(),
            hours,
            rows_written,
            sys_time: ctx.sys_time(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
