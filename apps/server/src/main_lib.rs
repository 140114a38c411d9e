use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use brokerbridge_market_data::{
    BrokerConfig, BrokerContext, BrokerRegistry, TokenLifecycleManager, TokenRotator,
};

use crate::config::Config;
use crate::secrets::{CommandAuthenticator, TokenFile};

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Builds one adapter and rotator per configured broker and registers them with a
/// fresh lifecycle manager.
pub fn build_manager(config: &Config) -> anyhow::Result<Arc<TokenLifecycleManager>> {
    let registry = BrokerRegistry::with_defaults();
    let token_file = TokenFile::open(config.token_file.clone(), config.token_key.as_deref())
        .with_context(|| format!("Failed to open token file {}", config.token_file.display()))?;

    let mut manager = TokenLifecycleManager::new(config.lifecycle());

    for name in &config.brokers {
        let broker_type = registry
            .broker_types()
            .into_iter()
            .find(|registered| *registered == name.as_str())
            .ok_or_else(|| {
                anyhow!(
                    "Unknown broker '{}' in BB_BROKERS (supported: {})",
                    name,
                    registry.broker_types().join(", ")
                )
            })?;

        let settings = config.settings_for(broker_type);
        let broker_config = BrokerConfig::for_broker(broker_type)
            .map(|defaults| settings.apply(defaults))
            .ok_or_else(|| anyhow!("No default settings for broker '{}'", broker_type))?;

        let token_store = Arc::new(token_file.store_for(broker_type));
        let adapter = registry.create(
            broker_type,
            BrokerContext::new(broker_config, token_store.clone()),
        )?;
        let authenticator = Arc::new(CommandAuthenticator::new(
            broker_type,
            settings.login_cmd.clone(),
            config.login_timeout,
        ));
        let rotator = Arc::new(TokenRotator::new(broker_type, authenticator, token_store));

        info!(
            "Registered broker {} (login command {})",
            broker_type,
            if settings.login_cmd.is_some() {
                "configured"
            } else {
                "missing"
            }
        );
        manager.register(adapter, rotator);
    }

    Ok(Arc::new(manager))
}
