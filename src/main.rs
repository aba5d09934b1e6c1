//! snowdrift CLI: one-shot synchronization of warehouse tables and pipes
//! against the parquet files in a landing location.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use snowdrift::clock::SystemClock;
use snowdrift::warehouse::RestConnector;
use snowdrift::{Config, RunStatus, StorageProvider, Synchronizer};

/// Warehouse table and pipe synchronizer.
#[derive(Parser, Debug)]
#[command(name = "snowdrift")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without synchronizing.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("snowdrift starting");

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Storage: {}", config.storage.url);
        info!(
            "Warehouse: {}.{} (account {})",
            config.warehouse.database, config.warehouse.schema, config.warehouse.account
        );
        info!("Stage: {}", config.sync.stage);
        info!("Excluded tables: {}", config.sync.excluded_tables.len());
        info!("Configuration is valid");
        return ExitCode::SUCCESS;
    }

    let storage = match StorageProvider::for_url_with_options(
        &config.storage.url,
        config.storage.storage_options.clone(),
    )
    .await
    {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Failed to open storage location: {e}");
            return ExitCode::FAILURE;
        }
    };

    let connector = RestConnector::new(config.warehouse.clone());
    let clock = SystemClock;

    let synchronizer = Synchronizer::new(&config, &storage, &clock);
    let outcome = synchronizer.run(&connector).await;

    info!("  Tables synchronized: {}", outcome.succeeded.len());
    info!("  Tables failed: {}", outcome.failed.len());
    for failure in &outcome.failed {
        error!("  {} -> {}", failure.table, failure.error);
    }

    match outcome.status {
        RunStatus::Success => ExitCode::SUCCESS,
        RunStatus::PartialFailure | RunStatus::Fatal => ExitCode::FAILURE,
    }
}
