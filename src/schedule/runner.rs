//! Embedded scheduler.
//!
//! Stand-in for an external orchestrator: fires the ingestion step on the
//! job's cron ticks and applies the job's retry and timeout policy. Runs
//! are awaited one after another, so at most one is ever active, and
//! ticks missed while a run was in progress are dropped.

use chrono::Utc;
use std::future::Future;
use tracing::{info, warn};

use super::{next_ticks, JobSpec};
use crate::engine::{IngestReport, IngestStep};
use crate::types::{IngestError, RunContext, RunId};

/// Run the step once under the job's policy: up to `retries + 1` attempts,
/// each bounded by the task timeout, with `retry_delay` between them.
pub async fn run_with_policy(
    step: &IngestStep,
    spec: &JobSpec,
    run_id: RunId,
) -> Result<IngestReport, IngestError> {
    let max_attempts = spec.retries + 1;
    let task_timeout = spec.task_timeout();
    let mut attempt = 1;
    loop {
        let ctx = RunContext::new(run_id.clone());
        let result = match tokio::time::timeout(task_timeout, step.run(&ctx)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::TimedOut(format!(
                "task '{}' exceeded {}s",
                spec.task_id,
                task_timeout.as_secs()
            ))),
        };

        match result {
            Ok(report) => return Ok(report),
            Err(e) if attempt < max_attempts => {
                warn!(
                    run_id = %run_id,
                    attempt,
                    max_attempts,
                    retry_in_secs = spec.retry_delay_secs,
                    error = %e,
                    "Attempt failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(spec.retry_delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fire the step on every cron tick until `shutdown` resolves.
///
/// Returns the number of runs started. A failed run is logged and the loop
/// waits for the next tick.
pub async fn watch<F>(step: &IngestStep, spec: &JobSpec, shutdown: F) -> Result<u64, IngestError>
where
    F: Future<Output = ()>,
{
    spec.validate()?;
    let schedule = spec.cron_schedule()?;
    if spec.catchup {
        warn!(dag_id = %spec.dag_id, "Catch-up is not supported by the embedded scheduler; missed ticks are skipped");
    }

    tokio::pin!(shutdown);
    let mut runs = 0u64;

    info!(
        dag_id = %spec.dag_id,
        schedule = %spec.schedule,
        "Embedded scheduler started. Press Ctrl+C to stop."
    );

    loop {
        let now = Utc::now();
        let Some(next) = next_ticks(&schedule, now, spec.start_instant(), 1).pop() else {
            info!(dag_id = %spec.dag_id, "Schedule has no further ticks");
            return Ok(runs);
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_tick = %next, wait_secs = wait.as_secs(), "Waiting for next tick");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                return Ok(runs);
            }
        }

        runs += 1;
        let run_id = RunId::new(format!("scheduled__{}", next.to_rfc3339()));
        tokio::select! {
            result = run_with_policy(step, spec, run_id.clone()) => {
                if let Err(e) = result {
                    warn!(run_id = %run_id, kind = e.kind(), error = %e, "Scheduled run failed, waiting for next tick");
                }
            }
            _ = &mut shutdown => {
                info!(run_id = %run_id, "Shutdown signal received during run; aborting it.");
                return Ok(runs);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
