pub mod breakdown;
pub mod config;
pub mod feed;
pub mod model;
pub mod navigator;
pub mod storage;
pub mod sync;
pub mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use config::Config;
use feed::HttpFeedSource;
use storage::PersistenceGateway;
use sync::SyncReport;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "feedboard",
    version,
    about = "Track feed entries as tasks on a terminal board"
)]
pub struct Cli {
    /// Path to the board database (the extension selects the format; only .json is supported)
    pub db: PathBuf,

    /// Open the board without fetching feeds first
    #[arg(long, default_value_t = false, conflicts_with = "sync_only")]
    pub no_sync: bool,

    /// Fetch feeds, save the database, and exit without opening the board
    #[arg(long, default_value_t = false)]
    pub sync_only: bool,

    /// Directory for the log file (overrides FEEDBOARD_LOG_DIR)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    let _guard = init_tracing(&config);

    run_with(&cli, &config)
}

/// Loads the database, synchronizes feeds, then either saves and exits
/// (`--sync-only`) or hands over to the board.
pub fn run_with(cli: &Cli, config: &Config) -> Result<()> {
    let gateway = PersistenceGateway::for_path(&cli.db)?;
    let mut db = gateway
        .load()
        .with_context(|| format!("loading {}", cli.db.display()))?;
    db.validate()?;

    let report = if cli.no_sync {
        SyncReport::default()
    } else {
        let source = HttpFeedSource::new(&config.user_agent, config.http_timeout)?;
        sync::synchronize(&mut db, &source).context("synchronizing feeds")?
    };

    if cli.sync_only {
        gateway
            .save(&db)
            .with_context(|| format!("saving {}", cli.db.display()))?;
        for resource in &report.resources {
            println!(
                "{}: {} new, {} known",
                resource.resource,
                resource.inserted.len(),
                resource.already_known
            );
        }
        println!(
            "{} new items from {} feeds",
            report.total_inserted(),
            report.resources.len()
        );
        return Ok(());
    }

    ui::tui::run_tui(db, gateway, &report)
}

/// Installs a file-backed subscriber; the terminal belongs to the board.
/// Returns `None` (logging off) when no log directory is usable.
pub fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let dir = config.log_dir.as_ref()?;
    std::fs::create_dir_all(dir).ok()?;

    let appender = tracing_appender::rolling::never(dir, config::LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .ok()?;
    Some(guard)
}
