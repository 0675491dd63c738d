//! trail-send - Background daemon for scheduled posting
//!
//! Monitors the schedule queue and dispatches entries to their target
//! platforms when their fire time arrives.

use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use libtrailcast::caption::CaptionGateway;
use libtrailcast::config::resolve_db_path;
use libtrailcast::dispatch::Dispatcher;
use libtrailcast::logging;
use libtrailcast::publishers::{create_publishers, Publisher};
use libtrailcast::scheduler::Scheduler;
use libtrailcast::{Config, ScheduleStore};

#[derive(Parser, Debug)]
#[command(name = "trail-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled posting")]
#[command(long_about = "\
trail-send - Background daemon for scheduled posting

DESCRIPTION:
    trail-send is a long-running daemon that monitors the Trailcast queue
    and posts scheduled content when its fire time arrives.

    On startup it recovers entries left mid-dispatch by a previous run,
    then scans the queue at regular intervals. Each due entry is claimed
    atomically and fanned out to its target platforms concurrently, so a
    second daemon instance never double-posts.

USAGE:
    # Run in foreground (logs to stderr)
    trail-send

    # Run with a custom tick interval
    trail-send --tick-interval 30

    # Process due entries once and exit
    trail-send --once

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes in-flight dispatches)

CONFIGURATION:
    Configuration file: ~/.config/trailcast/config.toml
    Database location: ~/.local/share/trailcast/trailcast.db

    [scheduler]
    tick_interval_secs = 60      # seconds between queue scans
    publish_timeout_secs = 120   # per-platform publish deadline

    Logging is controlled by TRAILCAST_LOG_FORMAT (text, json, pretty)
    and TRAILCAST_LOG_LEVEL.

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
")]
struct Cli {
    /// Tick interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    tick_interval: Option<u64>,

    /// Run one tick and exit (for testing)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_default();

    let config = Config::load()?;
    let store = ScheduleStore::new(&resolve_db_path(&config.database.path)).await?;

    info!("trail-send daemon starting");

    let tick_interval = Duration::from_secs(
        cli.tick_interval
            .unwrap_or(config.scheduler.tick_interval_secs),
    );
    let publish_timeout = Duration::from_secs(config.scheduler.publish_timeout_secs);

    let caption = Arc::new(CaptionGateway::new(config.caption.clone()));
    let publishers = create_publishers(&config);
    if publishers.is_empty() {
        info!("No platforms configured; due entries will settle as failed");
    } else {
        let names: Vec<&str> = publishers.iter().map(|p| p.platform().as_str()).collect();
        info!(platforms = names.join(", "), "Publishers ready");
    }

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        publishers,
        caption,
        publish_timeout,
    ));
    let scheduler = Scheduler::new(store, dispatcher, tick_interval);

    // Pick up anything a crashed run left in mid-dispatch
    let now = chrono::Utc::now().timestamp();
    scheduler.recover(now).await?;

    if cli.once {
        let report = scheduler.run_once(now).await?;
        info!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            errors = report.errors,
            "Processed due entries once, exiting"
        );
    } else {
        setup_signal_handlers(scheduler.shutdown_handle())?;
        scheduler.run().await?;
    }

    info!("trail-send daemon stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    let _ = shutdown;
    Ok(())
}
