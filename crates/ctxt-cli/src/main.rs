//! `ctxt`: end-to-end encrypted SMS bodies from the command line.
//!
//! Keys live in a directory (`CTXT_DATA_DIR` or `--data-dir`). Sealed
//! messages are printed as septet text ready to paste into an SMS.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ctxt_crypto::{CryptoContext, CryptoWorker};
use ctxt_store::FsBlobStore;
use tracing::debug;

use crate::commands::Command;
use crate::config::{Config, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(name = "ctxt", version, about)]
struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true)]
    json: bool,

    /// Key directory. Overrides CTXT_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    debug!(?config, "Loaded config");

    let store = Arc::new(FsBlobStore::open(&config.data_dir)?);
    let ctx = CryptoContext::open(store)?;
    let worker = CryptoWorker::spawn(ctx, config.worker_threads)?;

    let result = commands::run(cli.command, &worker.handle(), &config, cli.json).await;

    // Joining blocks; keep it off the runtime threads.
    tokio::task::spawn_blocking(move || worker.shutdown()).await?;
    result
}
