//! trail-post - Create content and schedule it for posting
//!
//! Unix-style tool for getting posts into the Trailcast queue.

use clap::{Parser, Subcommand};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use libtrailcast::caption::CaptionGateway;
use libtrailcast::config::resolve_db_path;
use libtrailcast::dispatch::{DispatchOutcome, Dispatcher};
use libtrailcast::error::PublishError;
use libtrailcast::publishers::create_publishers;
use libtrailcast::scheduling::{format_fire_time, parse_fire_time};
use libtrailcast::trends::sample_trends;
use libtrailcast::types::{ContentItem, PlatformId};
use libtrailcast::{Config, Result, ScheduleStore, TrailcastError};

#[derive(Parser, Debug)]
#[command(name = "trail-post")]
#[command(version)]
#[command(about = "Create content and schedule it for posting")]
#[command(long_about = "\
trail-post - Create content and schedule it for posting

DESCRIPTION:
    trail-post is a Unix-style tool for creating content items and putting
    them into the Trailcast schedule queue. Captions can be generated, the
    actual posting is done by the trail-send daemon (or 'trail-post now').

COMMANDS:
    create      Create a content item
    trends      List built-in trend suggestions
    seed        Create content items from the trend suggestions
    caption     Generate or set a content item's caption
    schedule    Schedule a content item for posting
    now         Schedule and post a content item immediately

USAGE EXAMPLES:
    # Create a content item
    trail-post create \"Murchison Falls: What to Expect\" \\
        --summary \"The roar of the falls\" --tags \"#Travel,#Wildlife\"

    # Generate a caption for it
    trail-post caption <CONTENT_ID>

    # Schedule it for tomorrow morning on the default platforms
    trail-post schedule <CONTENT_ID> --at \"tomorrow 9am\"

    # Post immediately to specific platforms
    trail-post now <CONTENT_ID> --platforms instagram,tiktok

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
    3 - Invalid input (bad content ID, time format, etc.)
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
    /// Create a content item
    Create {
        /// Post title
        title: String,

        /// Short summary of the post
        #[arg(short, long)]
        summary: String,

        /// Comma-separated hashtags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Media reference (local path or remote URI)
        #[arg(short, long)]
        media: Option<String>,

        /// Caption (skips generation)
        #[arg(short, long)]
        caption: Option<String>,
    },

    /// List built-in trend suggestions
    Trends,

    /// Create content items from the trend suggestions
    Seed,

    /// Generate or set a content item's caption
    Caption {
        /// Content item ID
        content_id: String,

        /// Set this exact caption instead of generating one
        #[arg(long)]
        set: Option<String>,
    },

    /// Schedule a content item for posting
    Schedule {
        /// Content item ID
        content_id: String,

        /// Fire time (e.g. "now", "2h", "tomorrow 9am")
        #[arg(short, long, default_value = "now")]
        at: String,

        /// Comma-separated platforms (defaults from config)
        #[arg(short, long, value_delimiter = ',')]
        platforms: Vec<String>,
    },

    /// Schedule and post a content item immediately
    Now {
        /// Content item ID
        content_id: String,

        /// Comma-separated platforms (defaults from config)
        #[arg(short, long, value_delimiter = ',')]
        platforms: Vec<String>,
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
        Commands::Create {
            title,
            summary,
            tags,
            media,
            caption,
        } => cmd_create(&store, title, summary, tags, media, caption).await?,
        Commands::Trends => cmd_trends(),
        Commands::Seed => cmd_seed(&store).await?,
        Commands::Caption { content_id, set } => {
            cmd_caption(&store, &config, &content_id, set).await?
        }
        Commands::Schedule {
            content_id,
            at,
            platforms,
        } => cmd_schedule(&store, &config, &content_id, &at, &platforms).await?,
        Commands::Now {
            content_id,
            platforms,
        } => cmd_now(&store, &config, &content_id, &platforms).await?,
    }

    Ok(())
}

async fn cmd_create(
    store: &ScheduleStore,
    title: String,
    summary: String,
    tags: Vec<String>,
    media: Option<String>,
    caption: Option<String>,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TrailcastError::InvalidInput(
            "Title cannot be empty".to_string(),
        ));
    }

    let mut item = ContentItem::new(title, summary, tags);
    item.media_ref = media;
    item.caption = caption;

    store.create_content_item(&item).await?;
    println!("{}", item.id);
    Ok(())
}

fn cmd_trends() {
    for trend in sample_trends() {
        println!("{}", trend.title);
        println!("  {}", trend.summary);
        println!("  {}", trend.tags.join(" "));
    }
}

async fn cmd_seed(store: &ScheduleStore) -> Result<()> {
    for trend in sample_trends() {
        let item = trend.to_content_item();
        store.create_content_item(&item).await?;
        println!("{}  {}", item.id, item.title);
    }
    Ok(())
}

async fn cmd_caption(
    store: &ScheduleStore,
    config: &Config,
    content_id: &str,
    set: Option<String>,
) -> Result<()> {
    let item = store.get_content_item(content_id).await?;

    let caption = match set {
        Some(caption) => caption,
        None => {
            let gateway = CaptionGateway::new(config.caption.clone());
            let generated = gateway.generate(&item).await;
            if let Some(warning) = generated.warning {
                eprintln!("Warning: {}", warning);
            }
            generated.text
        }
    };

    store.update_caption(content_id, &caption).await?;
    println!("{}", caption);
    Ok(())
}

async fn cmd_schedule(
    store: &ScheduleStore,
    config: &Config,
    content_id: &str,
    at: &str,
    platforms: &[String],
) -> Result<()> {
    let platforms = resolve_platforms(platforms, config)?;
    let fire_at = parse_fire_time(at)?.timestamp();

    let entry = store.create_entry(content_id, platforms, fire_at).await?;

    println!("{}", entry.id);
    eprintln!(
        "Scheduled for {} on {}",
        format_fire_time(entry.fire_at),
        entry
            .platforms
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

async fn cmd_now(
    store: &ScheduleStore,
    config: &Config,
    content_id: &str,
    platforms: &[String],
) -> Result<()> {
    let platforms = resolve_platforms(platforms, config)?;
    let fire_at = chrono::Utc::now().timestamp();

    let entry = store.create_entry(content_id, platforms, fire_at).await?;

    let caption = Arc::new(CaptionGateway::new(config.caption.clone()));
    let publishers = create_publishers(config);
    let dispatcher = Dispatcher::new(
        store.clone(),
        publishers,
        caption,
        Duration::from_secs(config.scheduler.publish_timeout_secs),
    );

    match dispatcher.dispatch(&entry.id).await? {
        DispatchOutcome::Dispatched(status, results) => {
            for result in &results {
                match &result.outcome {
                    libtrailcast::PostOutcome::Posted { remote_id } => {
                        println!("{}: posted ({})", result.platform, remote_id);
                    }
                    libtrailcast::PostOutcome::Failed { reason } => {
                        println!("{}: failed ({})", result.platform, reason);
                    }
                }
            }

            if !results.iter().any(|r| r.is_success()) {
                return Err(TrailcastError::Publish(PublishError::Remote(format!(
                    "entry {} failed on every platform",
                    entry.id
                ))));
            }

            eprintln!("Entry {} settled as {}", entry.id, status);
        }
        DispatchOutcome::Skipped => {
            // Freshly created and claimed by us alone; only a racing
            // daemon tick can get here first.
            eprintln!("Entry {} was already picked up", entry.id);
        }
    }

    Ok(())
}

fn resolve_platforms(specified: &[String], config: &Config) -> Result<Vec<PlatformId>> {
    let names: Vec<&String> = if specified.is_empty() {
        config.defaults.platforms.iter().collect()
    } else {
        specified.iter().collect()
    };

    let mut platforms = Vec::new();
    for name in names {
        let platform = PlatformId::from_str(name).map_err(TrailcastError::InvalidInput)?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }

    if platforms.is_empty() {
        return Err(TrailcastError::InvalidInput(
            "No platforms specified and no defaults configured".to_string(),
        ));
    }

    Ok(platforms)
}
