use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use meteo_ingest::config::AppConfig;
use meteo_ingest::engine::IngestStep;
use meteo_ingest::schedule::{runner, JobSpec};
use meteo_ingest::types::RunId;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo-ingest", version, about = "Hourly Open-Meteo forecast ingestion")]
pub struct Cli {
    /// Path to the TOML config; built-in defaults apply if it does not exist.
    #[arg(long, global = true, env = "METEO_CONFIG", default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the forecast once and append it to the weather table.
    Run {
        /// Identifier assigned by the invoking scheduler; random if absent.
        #[arg(long, env = "METEO_RUN_ID")]
        run_id: Option<String>,
    },

    /// Print the job spec and its upcoming fire times.
    Schedule {
        /// Number of upcoming ticks to list.
        #[arg(long, default_value_t = 5)]
        count: usize,
    },

    /// Run on the job's own schedule until interrupted.
    Watch,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let cfg = AppConfig::load_or_default(&self.config)?;

        match self.command {
            Command::Run { run_id } => {
                let run_id = run_id.map(RunId::new).unwrap_or_else(RunId::generate);
                let step = IngestStep::from_config(&cfg)?;
                // A one-shot run leaves retrying to whoever invoked it.
                let spec = JobSpec {
                    retries: 0,
                    ..cfg.job.clone()
                };
                let report = runner::run_with_policy(&step, &spec, run_id)
                    .await
                    .context("Ingestion run failed")?;
                info!(
                    run_id = %report.run_id,
                    rows = report.rows_written,
                    "Done"
                );
            }
            Command::Schedule { count } => {
                let spec = serde_json::to_string_pretty(&cfg.job)
                    .context("Failed to serialise job spec")?;
                println!("{spec}");
                println!("\nNext {count} fire times (UTC):");
                for tick in cfg.job.next_fire_times(Utc::now(), count)? {
                    println!("  {}", tick.to_rfc3339());
                }
            }
            Command::Watch => {
                let step = IngestStep::from_config(&cfg)?;
                let shutdown = async {
                    let _ = tokio::signal::ctrl_c().await;
                };
                let runs = runner::watch(&step, &cfg.job, shutdown).await?;
                info!(runs, "Embedded scheduler stopped.");
            }
        }

        Ok(())
    }
}
