//! trail-queue - Inspect and manage the schedule queue
//!
//! Unix-style tool for listing, cancelling and force-dispatching
//! schedule entries.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use libtrailcast::caption::CaptionGateway;
use libtrailcast::config::resolve_db_path;
use libtrailcast::dispatch::{DispatchOutcome, Dispatcher};
use libtrailcast::publishers::create_publishers;
use libtrailcast::scheduling::{format_fire_time, parse_fire_time};
use libtrailcast::types::EntryStatus;
use libtrailcast::{Config, PostOutcome, Result, ScheduleStore, TrailcastError};

#[derive(Parser, Debug)]
#[command(name = "trail-queue")]
#[command(version)]
#[command(about = "Inspect and manage the schedule queue")]
#[command(long_about = "\
trail-queue - Inspect and manage the schedule queue

DESCRIPTION:
    trail-queue is a Unix-style tool for working with the Trailcast
    schedule queue. Use it to list entries, cancel pending ones, force an
    entry to post immediately, and view per-platform results.

COMMANDS:
    list        List schedule entries
    cancel      Cancel a pending entry
    reschedule  Move a pending entry to a new fire time
    now         Dispatch a pending entry immediately
    results     Show per-platform results for an entry
    stats       Show queue statistics

USAGE EXAMPLES:
    # List all entries
    trail-queue list

    # List only pending entries as JSON
    trail-queue list --status pending --format json

    # Cancel a pending entry
    trail-queue cancel <ENTRY_ID>

    # Push a pending entry back two hours
    trail-queue reschedule <ENTRY_ID> --at 2h

    # Post an entry right now, ignoring its fire time
    trail-queue now <ENTRY_ID>

    # See what happened to a dispatched entry
    trail-queue results <ENTRY_ID>

CONFIGURATION:
    Configuration file: ~/.config/trailcast/config.toml
    Database location: ~/.local/share/trailcast/trailcast.db

    Override with environment variables:
        TRAILCAST_CONFIG    - Path to config file
        TRAILCAST_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Authentication error
    3 - Invalid input (bad entry ID, entry not cancellable, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List schedule entries
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Filter by status (pending, dispatching, succeeded, ...)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Cancel a pending entry
    Cancel {
        /// Entry ID to cancel
        entry_id: String,
    },

    /// Move a pending entry to a new fire time
    Reschedule {
        /// Entry ID to reschedule
        entry_id: String,

        /// New fire time: "now", a duration ("30m", "2h"), or natural
        /// language ("tomorrow 9am")
        #[arg(short, long)]
        at: String,
    },

    /// Dispatch a pending entry immediately
    Now {
        /// Entry ID to dispatch
        entry_id: String,
    },

    /// Show per-platform results for an entry
    Results {
        /// Entry ID
        entry_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("error")
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = ScheduleStore::new(&resolve_db_path(&config.database.path)).await?;

    match cli.command {
        Commands::List {
            format,
            status,
            limit,
        } => cmd_list(&store, &format, status.as_deref(), limit).await?,
        Commands::Cancel { entry_id } => cmd_cancel(&store, &entry_id).await?,
        Commands::Reschedule { entry_id, at } => {
            cmd_reschedule(&store, &entry_id, &at).await?
        }
        Commands::Now { entry_id } => cmd_now(&store, &config, &entry_id).await?,
        Commands::Results { entry_id, format } => {
            cmd_results(&store, &entry_id, &format).await?
        }
        Commands::Stats { format } => cmd_stats(&store, &format).await?,
    }

    Ok(())
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(TrailcastError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

async fn cmd_list(
    store: &ScheduleStore,
    format: &str,
    status: Option<&str>,
    limit: usize,
) -> Result<()> {
    validate_format(format)?;

    let status = status
        .map(|s| {
            EntryStatus::parse(s).ok_or_else(|| {
                TrailcastError::InvalidInput(format!("Unknown status: {}", s))
            })
        })
        .transpose()?;

    let mut entries = store.list_entries(limit).await?;
    if let Some(status) = status {
        entries.retain(|e| e.status == status);
    }

    if format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries)
                .map_err(|e| TrailcastError::InvalidInput(e.to_string()))?
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("No schedule entries");
        return Ok(());
    }

    for entry in entries {
        let platforms: Vec<&str> = entry.platforms.iter().map(|p| p.as_str()).collect();
        println!(
            "{}  {:<17} {}  [{}]",
            entry.id,
            entry.status,
            format_fire_time(entry.fire_at),
            platforms.join(", ")
        );
    }

    Ok(())
}

async fn cmd_cancel(store: &ScheduleStore, entry_id: &str) -> Result<()> {
    store.cancel(entry_id).await?;
    println!("Cancelled {}", entry_id);
    Ok(())
}

async fn cmd_reschedule(store: &ScheduleStore, entry_id: &str, at: &str) -> Result<()> {
    let fire_at = parse_fire_time(at)?;
    store.reschedule(entry_id, fire_at.timestamp()).await?;
    println!(
        "Rescheduled {} to {}",
        entry_id,
        format_fire_time(fire_at.timestamp())
    );
    Ok(())
}

async fn cmd_now(store: &ScheduleStore, config: &Config, entry_id: &str) -> Result<()> {
    let caption = Arc::new(CaptionGateway::new(config.caption.clone()));
    let publishers = create_publishers(config);
    let dispatcher = Dispatcher::new(
        store.clone(),
        publishers,
        caption,
        Duration::from_secs(config.scheduler.publish_timeout_secs),
    );

    match dispatcher.dispatch(entry_id).await? {
        DispatchOutcome::Dispatched(status, results) => {
            for result in &results {
                match &result.outcome {
                    PostOutcome::Posted { remote_id } => {
                        println!("{}: posted ({})", result.platform, remote_id);
                    }
                    PostOutcome::Failed { reason } => {
                        println!("{}: failed ({})", result.platform, reason);
                    }
                }
            }
            eprintln!("Entry {} settled as {}", entry_id, status);
        }
        DispatchOutcome::Skipped => {
            let entry = store.get_entry(entry_id).await?;
            return Err(TrailcastError::InvalidInput(format!(
                "Entry {} is {} and cannot be dispatched",
                entry_id, entry.status
            )));
        }
    }

    Ok(())
}

async fn cmd_results(store: &ScheduleStore, entry_id: &str, format: &str) -> Result<()> {
    validate_format(format)?;

    // Errors early with a clear message when the entry doesn't exist
    let entry = store.get_entry(entry_id).await?;
    let results = store.results_for(entry_id).await?;

    if format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&results)
                .map_err(|e| TrailcastError::InvalidInput(e.to_string()))?
        );
        return Ok(());
    }

    println!("Entry {} ({})", entry.id, entry.status);
    if results.is_empty() {
        println!("No results yet");
        return Ok(());
    }

    for result in results {
        match &result.outcome {
            PostOutcome::Posted { remote_id } => {
                println!(
                    "  {:<20} posted  {}  {}",
                    result.platform.as_str(),
                    remote_id,
                    format_fire_time(result.completed_at)
                );
            }
            PostOutcome::Failed { reason } => {
                println!(
                    "  {:<20} failed  {}  {}",
                    result.platform.as_str(),
                    reason,
                    format_fire_time(result.completed_at)
                );
            }
        }
    }

    Ok(())
}

async fn cmd_stats(store: &ScheduleStore, format: &str) -> Result<()> {
    validate_format(format)?;

    let stats = store.stats().await?;

    if format == "json" {
        println!(
            "{}",
            serde_json::json!({
                "pending": stats.pending,
                "dispatching": stats.dispatching,
                "succeeded": stats.succeeded,
                "partially_failed": stats.partially_failed,
                "failed": stats.failed,
                "cancelled": stats.cancelled,
                "total": stats.total(),
            })
        );
        return Ok(());
    }

    println!("Pending:          {}", stats.pending);
    println!("Dispatching:      {}", stats.dispatching);
    println!("Succeeded:        {}", stats.succeeded);
    println!("Partially failed: {}", stats.partially_failed);
    println!("Failed:           {}", stats.failed);
    println!("Cancelled:        {}", stats.cancelled);
    println!("Total:            {}", stats.total());

    Ok(())
}
