//! Job description for whatever scheduler runs the ingestion.
//!
//! [`JobSpec`] is a plain value: schedule, timeouts, retry and concurrency
//! policy. An external orchestrator reads it (see `meteo-ingest schedule`);
//! the embedded loop in [`runner`] honours it directly.

pub mod runner;

use chrono::{DateTime, NaiveDate, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::types::IngestError;

/// Declarative scheduling metadata for the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    pub dag_id: String,
    pub description: String,
    pub owner: String,
    /// Standard 5-field cron, or 6-field with leading seconds. Evaluated in UTC.
    pub schedule: String,
    /// No tick before this date (UTC midnight) is ever run.
    pub start_date: NaiveDate,
    /// Replay ticks missed while nothing was running.
    pub catchup: bool,
    pub max_active_runs: u32,
    pub depends_on_past: bool,
    /// Extra attempts after a failed one.
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// Default budget for one attempt of any task in the job.
    pub execution_timeout_secs: u64,
    pub task_id: String,
    /// Per-task override of `execution_timeout_secs`.
    pub task_timeout_secs: Option<u64>,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    pub tags: Vec<String>,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            dag_id: "subquery_weather_v1".to_string(),
            description: "Hourly Moscow weather forecast from the Open-Meteo API".to_string(),
            owner: "data_engineering".to_string(),
            schedule: "0 12 * * *".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN),
            catchup: false,
            max_active_runs: 1,
            depends_on_past: false,
            retries: 0,
            retry_delay_secs: 5 * 60,
            execution_timeout_secs: 10 * 60,
            task_id: "fetch_and_save_weather_data".to_string(),
            task_timeout_secs: Some(15 * 60),
            email_on_failure: false,
            email_on_retry: false,
            tags: vec!["weather".to_string(), "data_collection".to_string()],
        }
    }
}

impl JobSpec {
    /// Reject specs no scheduler could honour.
    pub fn validate(&self) -> Result<(), IngestError> {
        self.cron_schedule()?;
        if self.max_active_runs == 0 {
            return Err(IngestError::Config("max_active_runs must be at least 1".into()));
        }
        if self.execution_timeout_secs == 0 || self.task_timeout_secs == Some(0) {
            return Err(IngestError::Config("timeouts must be greater than zero".into()));
        }
        Ok(())
    }

    /// Parsed cron schedule.
    pub fn cron_schedule(&self) -> Result<Schedule, IngestError> {
        let expr = normalize_cron(&self.schedule);
        Schedule::from_str(&expr).map_err(|e| {
            IngestError::Config(format!("invalid cron expression {:?}: {e}", self.schedule))
        })
    }

    /// Budget for one attempt of the ingestion task: the task's own
    /// timeout when set, else the job-wide default.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs.unwrap_or(self.execution_timeout_secs))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// First instant a tick may fire.
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Up to `count` ticks strictly after `after`, none before the start date.
    pub fn next_fire_times(
        &self,
        after: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, IngestError> {
        let schedule = self.cron_schedule()?;
        Ok(next_ticks(&schedule, after, self.start_instant(), count))
    }
}

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires `sec min hour day-of-month month day-of-week`.
pub(crate) fn normalize_cron(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Ticks after `max(after, start)`. Ticks at or before `after` are skipped,
/// so missed ticks are never replayed.
pub(crate) fn next_ticks(
    schedule: &Schedule,
    after: DateTime<Utc>,
    start: DateTime<Utc>,
    count: usize,
) -> Vec<DateTime<Utc>> {
    // `after()` is exclusive; step back one second so a tick exactly at
    // `start` still counts when `start` is in the future.
    let from = if start > after {
        start - chrono::Duration::seconds(1)
    } else {
        after
    };
    schedule.after(&from).take(count).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults_match_job_definition() {
        let spec = JobSpec::default();
        assert_eq!(spec.schedule, "0 12 * * *");
        assert_eq!(spec.retries, 0);
        assert_eq!(spec.retry_delay(), Duration::from_secs(300));
        assert_eq!(spec.dag_id, "subquery_weather_v1");
        assert_eq!(spec.task_timeout(), Duration::from_secs(900));
        assert!(!spec.catchup);
        assert_eq!(spec.max_active_runs, 1);
        assert_eq!(spec.start_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(spec.tags, vec!["weather", "data_collection"]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_normalize_cron() {
        assert_eq!(normalize_cron("0 12 * * *"), "0 0 12 * * *");
        assert_eq!(normalize_cron(" */5 * * * * * "), "*/5 * * * * *");
    }

    #[test]
    fn test_daily_noon_ticks() {
        let spec = JobSpec::default();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
        let ticks = spec.next_fire_times(now, 3).unwrap();
        assert_eq!(
            ticks,
            vec![
                Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_tick_at_now_is_not_replayed() {
        let spec = JobSpec::default();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let ticks = spec.next_fire_times(now, 1).unwrap();
        assert_eq!(ticks[0], Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_start_date_in_future() {
        let spec = JobSpec {
            schedule: "0 0 * * *".into(),
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            ..JobSpec::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let ticks = spec.next_fire_times(now, 1).unwrap();
        assert_eq!(ticks[0], Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_specs() {
        let bad_cron = JobSpec {
            schedule: "every three hours".into(),
            ..JobSpec::default()
        };
        assert!(matches!(bad_cron.validate(), Err(IngestError::Config(_))));

        let no_runs = JobSpec {
            max_active_runs: 0,
            ..JobSpec::default()
        };
        assert!(no_runs.validate().is_err());

        let no_timeout = JobSpec {
            task_timeout_secs: Some(0),
            ..JobSpec::default()
        };
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_task_timeout_overrides_job_default() {
        let spec = JobSpec::default();
        assert!(spec.task_timeout() > Duration::from_secs(spec.execution_timeout_secs));

        let inherited = JobSpec {
            task_timeout_secs: None,
            ..JobSpec::default()
        };
        assert_eq!(inherited.task_timeout(), Duration::from_secs(600));
        assert!(inherited.validate().is_ok());
    }

    #[test]
    fn test_spec_serializes_for_orchestrator() {
        let json = serde_json::to_value(JobSpec::default()).unwrap();
        assert_eq!(json["max_active_runs"], 1);
        assert_eq!(json["catchup"], false);
        assert_eq!(json["start_date"], "2023-01-01");
        assert_eq!(json["task_id"], "fetch_and_save_weather_data");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let spec: JobSpec = toml::from_str("retries = 2\nschedule = \"0 */3 * * *\"").unwrap();
        assert_eq!(spec.retries, 2);
        assert_eq!(spec.schedule, "0 */3 * * *");
        assert_eq!(spec.max_active_runs, 1);
        assert!(spec.validate().is_ok());
    }
}
