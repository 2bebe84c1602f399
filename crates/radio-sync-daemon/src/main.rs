mod logging;
mod schedule;

use chrono::Local;
use clap::Parser;
use radio_sync::api::StationClient;
use radio_sync::resolver::format_remaining;
use radio_sync::{Config, RunOutcome, SyncError};
use schedule::Schedule;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Download and tag radio broadcasts shortly before they air.
#[derive(Parser, Debug)]
#[command(name = "radio-sync-daemon", version)]
struct Args {
    /// Config file (defaults to ~/.config/radio-sync/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the pipeline once and exit instead of following the schedule
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let schedule = Schedule::new(&config.schedule.minutes)?;
    let log_path = logging::init(&config.log)?;

    info!("Program Start");
    info!("Log file: {:?}", log_path);

    let station = StationClient::from_config(&config);

    if args.once {
        run_logged(&config, &station).await?;
        return Ok(());
    }

    info!(
        "Running at minutes {:?} past every hour. Press Ctrl+C to exit",
        schedule.minutes()
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let now = Local::now().naive_local();
        let next = schedule.next_fire(now);
        info!("Next run at {}", next);
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = &mut shutdown => break,
        }

        tokio::select! {
            // failures are already logged; the next slot is the retry
            _ = run_logged(&config, &station) => {}
            _ = &mut shutdown => {
                warn!("Interrupted during a run");
                break;
            }
        }
    }

    info!("Program Stop");
    Ok(())
}

/// One pipeline run, with its outcome or failure written to the log.
async fn run_logged(config: &Config, station: &StationClient) -> Result<RunOutcome, SyncError> {
    let now = Local::now().naive_local();
    match radio_sync::run_once(config, station, now).await {
        Ok(outcome) => {
            match &outcome {
                RunOutcome::NotImminent {
                    title,
                    start,
                    remaining,
                } => info!(
                    "Next broadcast {:?} starts at {} (in {}), nothing to do",
                    title,
                    start,
                    format_remaining(*remaining)
                ),
                RunOutcome::NoAsset { target } => warn!(
                    "Broadcast had no {} media, {} not updated",
                    config.download.media_subtype,
                    target.display()
                ),
                RunOutcome::Tagged { target, bytes } => {
                    info!("Saved {} ({} bytes)", target.display(), bytes)
                }
            }
            Ok(outcome)
        }
        Err(e) => {
            error!(stage = %e.stage(), "Run failed: {}", e);
            Err(e)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
