//! Stop-loss feed binary
//!
//! Usage: `stoploss-feed [host:port]`

use anyhow::Context;
use log::{error, info};
use std::sync::Arc;
use stoploss_feed::*;
use tokio::signal;

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting Order and Tick Simulator...");

    let config = FeedConfig::from_args(std::env::args()).context("invalid arguments")?;

    let store = RedisStore::connect(&config.store)
        .await
        .with_context(|| format!("cannot reach store at {}", config.store.addr))?;

    let simulator = FeedSimulator::new(Arc::new(store), config)?;

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            shutdown.trigger();
        });
    }

    let (report, stats) = simulator.run(&shutdown).await?;

    info!(
        "Stopped: {} orders loaded ({} failed), {} cycles, {} ticks published, {} dropped",
        report.inserted,
        report.failed(),
        stats.cycles,
        stats.published,
        stats.dropped
    );
    info!("\n{}", simulator.metrics().read().summary());

    Ok(())
}
