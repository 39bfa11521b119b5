/// Satsang Player - headless host and persisted state inspector
mod config;
mod inspect;
mod simulate;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::HostConfig;
use satsang_core::KeyValueStore;
use satsang_diagnostics::{DiagnosticLog, DiagnosticsLayer};
use satsang_storage::SqliteStore;
use simulate::SimulateArgs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "satsang")]
#[command(about = "Satsang Player headless host", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SATSANG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the saved queue and the last-played breadcrumb
    Status,
    /// List saved playback positions
    Positions,
    /// Show the persisted diagnostic log
    Logs {
        /// Only the newest N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Forget the saved position of a track
    ResetPosition {
        /// Stream URL of the track
        url: String,
    },
    /// Play a queue on the headless engine and print state transitions
    Simulate {
        /// Stream URLs to enqueue
        #[arg(required_unless_present = "resume")]
        urls: Vec<String>,
        /// Tracks the queue may continue with once it ends
        #[arg(long = "catalog", value_name = "URL")]
        catalog: Vec<String>,
        /// Queue index to start from
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Duration given to every simulated track
        #[arg(long, default_value_t = 10.0)]
        track_secs: f64,
        /// Restore the saved queue and position instead of loading URLs
        #[arg(long, conflicts_with = "urls")]
        resume: bool,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = HostConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let store = SqliteStore::open(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let log = DiagnosticLog::with_store(config.diagnostics.clone(), Arc::clone(&store));
    log.restore().await;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satsang=info,satsang_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(DiagnosticsLayer::new(log.clone()))
        .init();

    match cli.command {
        Commands::Status => inspect::status(&store).await?,
        Commands::Positions => inspect::positions(&store).await?,
        Commands::Logs { limit } => inspect::logs(&store, limit).await?,
        Commands::ResetPosition { url } => inspect::reset_position(&store, &url).await?,
        Commands::Simulate {
            urls,
            catalog,
            start,
            track_secs,
            resume,
            seconds,
        } => {
            tracing::info!(database_url = %config.database_url, "starting headless session");
            let args = SimulateArgs {
                urls,
                catalog,
                start,
                track_secs,
                resume,
                seconds,
            };
            simulate::run(Arc::clone(&store), config.playback.clone(), args).await?;
        }
    }

    log.flush().await;
    Ok(())
}
