//! meteo-ingest: hourly Open-Meteo forecast ingestion.
//!
//! Entry point. Loads `.env`, initialises structured logging, then hands
//! over to the CLI: a one-shot run, the job spec, or the embedded scheduler.

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cmd = cli::Cli::parse();
    cmd.run().await
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("meteo_ingest=info"));

    let json_logging = std::env::var("METEO_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
