//! drivegram entry point.

mod app;
mod bridge;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Mirror a Google Drive account into a Telegram channel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (default: ./drivegram.toml, optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enumerate the account and print what would be sent, without sending
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting drivegram");

    let explicit = args.config.is_some();
    let path = args
        .config
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let config = config::Config::load(&path, explicit)?;
    if !args.dry_run {
        config.validate()?;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(app::run(config, args.dry_run))?;

    if let Some(summary) = summary
        && summary.cancelled
    {
        tracing::warn!("run was cancelled before all files were processed");
    }
    Ok(())
}
