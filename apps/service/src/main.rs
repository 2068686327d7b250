mod config;
mod monitoring;
mod notify;
mod store;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::monitoring::{CheckScheduler, HttpProber, LogRotator, Workers};
use crate::notify::{LogNotifier, Notifier, TwilioNotifier};
use crate::store::{FileDataStore, FileLogStore};

/// Background workers for Uppe: probes every check on a fixed interval,
/// alerts owners on state changes and rotates the outcome logs.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config (defaults to $XDG_CONFIG_HOME/uppe/workers.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Run a single sweep and a single log rotation, then exit
    #[arg(long, conflicts_with = "print_config")]
    once: bool,

    /// Print the contents of a rotated log archive and exit
    #[arg(long, value_name = "ARCHIVE")]
    show_archive: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_deref()).context("Failed to load config")?;

    if cli.print_config {
        print!("{config}");
        return Ok(());
    }

    if let Some(archive) = cli.show_archive {
        let log_store = FileLogStore::new(&config.storage.logs_dir);
        let text = log_store
            .decompress(&archive)
            .await
            .with_context(|| format!("Failed to read archive {archive}"))?;
        print!("{text}");
        return Ok(());
    }

    let data_store = Arc::new(FileDataStore::new(&config.storage.data_dir));
    let log_store = Arc::new(FileLogStore::new(&config.storage.logs_dir));

    let notifier: Arc<dyn Notifier> = match &config.notifier {
        Some(twilio) => {
            info!("Alerts will be sent through Twilio as {}", twilio.from_phone);
            Arc::new(TwilioNotifier::new(twilio.clone(), config.validation.phone_length))
        }
        None => {
            info!("No notifier configured, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let prober = Arc::new(HttpProber::new().context("Failed to build HTTP client")?);

    let scheduler = CheckScheduler::new(
        data_store,
        log_store.clone(),
        notifier,
        prober,
        config.validation.rules(),
        config.storage.checks_collection.clone(),
    );
    let workers = Workers::new(scheduler, LogRotator::new(log_store));

    if cli.once {
        let sweep = workers.run_sweep().await;
        let rotation = workers.rotate().await;
        for (id, cycle) in &sweep.cycles {
            info!("{id}: {cycle:?}");
        }
        for (log_name, result) in &rotation.results {
            info!("{log_name}: {result:?}");
        }
        return Ok(());
    }

    let handles = workers.start(config.workers.intervals());

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping background workers...");
    handles.stop().await;

    Ok(())
}
