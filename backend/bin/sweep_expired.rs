use matchings::{
    open_store,
    services::{MatchingQueryBuilder, MatchingService},
    utils::{init_logging, Config, StorageBackend, SystemClock},
};
use anyhow::Result;
use clap::{Arg, Command};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("sweep-expired")
        .about("Close OPEN matchings whose time window has elapsed")
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single sweep and exit (for an external scheduler)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interval-secs")
                .long("interval-secs")
                .help("Seconds between sweeps (defaults to SWEEP_INTERVAL_SECS)")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .get_matches();

    let config = Config::from_env()?;
    if config.storage_backend == StorageBackend::Memory {
        anyhow::bail!("sweep_expired needs a shared database; STORAGE_BACKEND=memory is per-process");
    }

    let store = open_store(&config).await?;
    let service = MatchingService::new(
        store,
        Arc::new(SystemClock),
        MatchingQueryBuilder::from_config(&config),
    );

    if matches.get_flag("once") {
        let closed = service.sweep_expired().await?;
        info!("🧹 Closed {} expired matchings", closed);
        return Ok(());
    }

    let period = matches
        .get_one::<u64>("interval-secs")
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or_else(|| config.sweep_interval());

    info!("⏱️ Starting matching sweeper (every {}s)...", period.as_secs());
    run_sweeper(service, period).await
}

async fn run_sweeper(service: MatchingService, period: Duration) -> Result<()> {
    let mut interval = time::interval(period);
    let mut iter_count: usize = 0;

    loop {
        interval.tick().await;
        iter_count += 1;

        // A failed pass is retried on the next tick; the sweep is idempotent
        match service.sweep_expired().await {
            Ok(closed) => {
                if closed > 0 {
                    info!("🧹 Sweep {} closed {} expired matchings", iter_count, closed);
                }
            }
            Err(e) => {
                error!("❌ Sweep {} failed: {}", iter_count, e);
            }
        }
    }
}
