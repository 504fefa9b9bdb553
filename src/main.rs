//! CLI entry point for the GTFS-RT disruption notifier.
//!
//! `run` performs one poll-detect-notify cycle and exits; `stats` prints the
//! persisted state counters. Exit status is non-zero on configuration or
//! fetch errors.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gtfs_rt_notify::bot::DisruptionBot;
use gtfs_rt_notify::config::Config;
use gtfs_rt_notify::state::StateStore;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_notify")]
#[command(about = "Watches a GTFS-RT feed and posts novel disruptions to Discord", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed once, notify, and persist state
    Run {
        /// Detect and log novel records but skip delivery and state save
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Print persisted state statistics as JSON
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_notify.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_notify.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { dry_run } => {
            let config = Config::from_env()?;
            let mut bot = DisruptionBot::new(config);
            let summary = bot.run_once(dry_run).await?;
            info!(
                alerts_novel = summary.alerts_novel,
                updates_novel = summary.updates_novel,
                "run complete"
            );
        }
        Commands::Stats => {
            let mut store = StateStore::new(&gtfs_rt_notify::config::state_dir_from_env());
            store.load();
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
    }

    Ok(())
}
