mod config;
mod main_lib;
mod scheduler;
mod secrets;

use config::Config;
use main_lib::{build_manager, init_tracing};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(&config.log_format);

    let manager = build_manager(&config)?;
    tracing::info!(
        "Starting BrokerBridge for {:?}, health check every {:?}",
        manager.broker_types(),
        config.health_check_interval
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let lifecycle = scheduler::start_token_lifecycle(manager.clone(), shutdown_rx).await;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true).ok();
    lifecycle.await?;

    scheduler::log_statuses(&manager).await;
    Ok(())
}
