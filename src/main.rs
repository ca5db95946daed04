mod baseline;
mod compare;
mod config;
mod detector;
mod errors;
mod monitor;
mod notify;
mod profile;
mod scheduler;
mod server;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::baseline::file::JsonFileStore;
use crate::compare::{HttpImageFetcher, ImageComparator};
use crate::config::Config;
use crate::detector::ChangeDetector;
use crate::monitor::Monitor;
use crate::notify::telegram::TelegramNotifier;
use crate::profile::LineProfileClient;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,profile_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let comparator = ImageComparator::from_config(&config.comparison);
    info!("Configuration loaded successfully");
    info!("  Accounts: {}", config.accounts.len());
    info!("  Comparison: {}", comparator);
    info!("  Baselines: {}", config.monitor.baseline_dir.display());
    match &config.monitor.cron {
        Some(expr) => info!("  Schedule: cron {}", expr),
        None => info!("  Schedule: every {}s", config.monitor.interval_secs),
    }

    let timeout = config.monitor.request_timeout();
    let profiles = LineProfileClient::new(&config.line.api_base_url, timeout)
        .context("Failed to create profile client")?;
    let images = HttpImageFetcher::new(timeout).context("Failed to create image fetcher")?;
    let notifier = TelegramNotifier::new(timeout, config.telegram.api_url.as_deref())
        .context("Failed to create Telegram notifier")?;

    let detector = ChangeDetector::new(
        Arc::new(profiles),
        Arc::new(JsonFileStore::new(&config.monitor.baseline_dir)),
        Arc::new(images),
        comparator,
    );
    let monitor = Arc::new(Monitor::new(
        config.accounts(),
        detector,
        Arc::new(notifier),
        config.monitor.parallelism,
    ));

    // Periodic checks
    let mut scheduler = Scheduler::new().await?;
    scheduler::tasks::register_builtin_tasks(&scheduler, monitor.clone(), &config.monitor)
        .await?;
    scheduler.start().await?;

    if config.monitor.check_on_startup {
        let monitor = monitor.clone();
        tokio::spawn(async move {
            monitor.run_check_cycle().await;
        });
    }

    // Manual trigger; returns on Ctrl-C
    server::serve(&config.server.bind, monitor).await?;

    scheduler.shutdown().await?;
    Ok(())
}
