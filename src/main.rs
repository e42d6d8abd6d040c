//! Vitalis CLI
//!
//! Command-line front end for the pipeline:
//! - Fetch raw or normalized records from a store snapshot
//! - Fetch and deliver records to a callback URL
//! - Align anchors and look up workout activities
//! - Generate a default config file

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitalis::config::{generate_default_config, Config};
use vitalis::logging::{env_filter, fmt_layer, LogChannel, Logger};
use vitalis::normalize::{activity, SleepOptions};
use vitalis::query::{align_anchor, parse_offset, AnchorBoundary, QueryFilter};
use vitalis::schema::DataType;
use vitalis::store::{CharacteristicKind, MemoryStore};
use vitalis::{Connection, FetchRequest};

#[derive(Parser)]
#[command(name = "vitalis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch health data and normalize it into one record schema")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON store snapshot to read from
    #[arg(short, long, global = true)]
    pub snapshot: Option<PathBuf>,
}

/// What to fetch
#[derive(Args)]
pub struct Selection {
    /// Data type (workouts, sleep, heart, steps, ...)
    pub data_type: DataType,

    /// Range start, RFC 3339 (default: from config)
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Range end, RFC 3339 (default: now)
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,

    /// Workout identifier to scope the fetch to
    #[arg(short, long)]
    pub workout: Option<String>,

    /// Raw statistics anchor, RFC 3339
    #[arg(long)]
    pub anchor: Option<DateTime<Utc>>,

    /// Characteristics to read (dateOfBirth, bloodType, ...)
    #[arg(long = "characteristic")]
    pub characteristics: Vec<CharacteristicKind>,

    /// Keep only objects recorded by this source
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Drop user-entered samples and workouts
    #[arg(long)]
    pub exclude_manual: bool,

    /// Split sleep sessions on gaps longer than this many minutes
    #[arg(long)]
    pub sleep_gap_minutes: Option<i64>,
}

impl Selection {
    fn request(&self) -> FetchRequest {
        let mut filter = QueryFilter::new();
        filter.exclude_manual = self.exclude_manual;
        filter.sources = self.sources.clone();
        filter.characteristics = self.characteristics.clone();

        let mut request = FetchRequest::new(self.data_type).filter(filter);
        request.from = self.from;
        request.to = self.to;
        request.workout_id = self.workout.clone();
        request.anchor = self.anchor;
        request
    }

    fn sleep_options(&self) -> SleepOptions {
        match self.sleep_gap_minutes {
            Some(minutes) => SleepOptions::split_on_gap(chrono::Duration::minutes(minutes)),
            None => SleepOptions::single_session(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and print records
    Fetch {
        #[command(flatten)]
        selection: Selection,

        /// Print the raw envelope instead of normalized records
        #[arg(long)]
        raw: bool,
    },

    /// Fetch records and deliver them to a callback URL
    Post {
        #[command(flatten)]
        selection: Selection,

        /// Callback URL (default: from config)
        #[arg(long)]
        callback_url: Option<String>,
    },

    /// Align an anchor to the previous boundary
    Align {
        /// Instant, RFC 3339
        instant: DateTime<Utc>,

        /// Calendar offset, e.g. +02:00
        #[arg(long, default_value = "+00:00")]
        offset: String,

        /// Align to midnight instead of the top of the hour
        #[arg(long)]
        day: bool,
    },

    /// Look up a workout activity code
    Activity {
        /// Activity-type code
        code: u32,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    // Initialize logging
    let channel = LogChannel::from_config(&config.logging).context("failed to open log sink")?;
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(env_filter(&level))
        .with(fmt_layer(config.logging.format, channel.clone()))
        .init();

    tracing::debug!("Vitalis v{}", env!("CARGO_PKG_VERSION"));

    let result = run(cli, config).await;
    channel.flush();
    result
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fetch { selection, raw } => {
            let connection = connect(config, cli.snapshot.as_ref(), &selection, None).await?;
            let request = selection.request();

            let output = if raw {
                let fetched = connection.fetch_raw(&request).await?;
                serde_json::to_string_pretty(&fetched.envelope)?
            } else {
                let records = connection.fetch_normalized(&request).await?;
                serde_json::to_string_pretty(&records)?
            };
            println!("{}", output);
        }

        Commands::Post {
            selection,
            callback_url,
        } => {
            let connection =
                connect(config, cli.snapshot.as_ref(), &selection, callback_url).await?;
            let posted = connection.fetch_and_post(&selection.request()).await?;

            // The process must outlive the spawned delivery
            let delivered = posted.delivery.await?;
            println!(
                "{} {} record(s) {}",
                if delivered { "Delivered" } else { "Failed to deliver" },
                posted.records.len(),
                selection.data_type
            );
        }

        Commands::Align {
            instant,
            offset,
            day,
        } => {
            let offset = parse_offset(&offset)
                .with_context(|| format!("invalid offset '{}'", offset))?;
            let boundary = if day {
                AnchorBoundary::Day
            } else {
                AnchorBoundary::Hour
            };
            let aligned = align_anchor(instant, offset, boundary);
            println!("{}", aligned.with_timezone(&offset).to_rfc3339());
        }

        Commands::Activity { code } => {
            let entry = activity::lookup(code);
            println!("code:        {}", entry.code);
            println!("name:        {}", entry.name);
            println!("common name: {}", entry.common_name);
            println!("icon:        {}", entry.icon);
            println!("emoji:       {}", entry.emoji.unwrap_or("-"));
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn connect(
    config: Config,
    snapshot: Option<&PathBuf>,
    selection: &Selection,
    callback_url: Option<String>,
) -> anyhow::Result<Connection> {
    let path = snapshot.context("--snapshot is required to fetch data")?;
    let store = MemoryStore::load(path)
        .await
        .with_context(|| format!("failed to load snapshot {:?}", path))?;

    let mut builder = Connection::builder(config)
        .store(Arc::new(store))
        .logger(Logger::current())
        .sleep_options(selection.sleep_options());
    if let Some(url) = callback_url {
        builder = builder.callback_url(url);
    }
    Ok(builder.build()?)
}
