//! Background token lifecycle for the server.
//!
//! Initializes every broker once, then hands over to the manager's health loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use brokerbridge_market_data::TokenLifecycleManager;

/// Initializes all brokers and starts the health loop. Brokers that fail here are
/// retried by the loop on its first cycle.
pub async fn start_token_lifecycle(
    manager: Arc<TokenLifecycleManager>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    manager.initialize_all().await;

    for status in manager.statuses().await {
        if status.state.is_healthy() {
            info!("{} ready", status.broker_type);
        } else {
            warn!(
                "{} not ready ({}): {}",
                status.broker_type,
                status.state,
                status.last_error.as_deref().unwrap_or("no details")
            );
        }
    }

    manager.start(shutdown)
}

/// Logs a one-line JSON summary of every broker's status.
pub async fn log_statuses(manager: &TokenLifecycleManager) {
    let statuses = manager.statuses().await;
    match serde_json::to_string(&statuses) {
        Ok(json) => info!("Broker status: {}", json),
        Err(e) => warn!("Failed to serialize broker status: {}", e),
    }
}
