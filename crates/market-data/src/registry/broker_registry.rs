//! Broker type to adapter constructor mapping.
//!
//! Broker types are registered explicitly, one constructor function per type. The
//! registry never derives module paths or type names from the broker string.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::broker::{upstox, zerodha, BrokerAdapter, UpstoxAdapter, ZerodhaAdapter};
use crate::config::BrokerConfig;
use crate::errors::GatewayError;
use crate::lifecycle::TokenStore;

/// Everything a constructor needs to build an adapter.
#[derive(Clone)]
pub struct BrokerContext {
    pub config: BrokerConfig,
    pub token_store: Arc<dyn TokenStore>,
}

impl BrokerContext {
    pub fn new(config: BrokerConfig, token_store: Arc<dyn TokenStore>) -> Self {
        Self {
            config,
            token_store,
        }
    }
}

/// Builds an adapter from its context.
pub type BrokerConstructor = fn(BrokerContext) -> Arc<dyn BrokerAdapter>;

fn build_upstox(context: BrokerContext) -> Arc<dyn BrokerAdapter> {
    Arc::new(UpstoxAdapter::new(context.config, context.token_store))
}

fn build_zerodha(context: BrokerContext) -> Arc<dyn BrokerAdapter> {
    Arc::new(ZerodhaAdapter::new(context.config, context.token_store))
}

/// Static mapping from broker type to constructor.
#[derive(Clone, Default)]
pub struct BrokerRegistry {
    constructors: BTreeMap<&'static str, BrokerConstructor>,
}

impl BrokerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in broker.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(upstox::BROKER_TYPE, build_upstox);
        registry.register(zerodha::BROKER_TYPE, build_zerodha);
        registry
    }

    /// Registers `constructor` under `broker_type` (lowercase), replacing any previous one.
    pub fn register(&mut self, broker_type: &'static str, constructor: BrokerConstructor) {
        debug!("Registering broker type {}", broker_type);
        self.constructors.insert(broker_type, constructor);
    }

    /// Builds an adapter for `broker_type` (case-insensitive).
    pub fn create(
        &self,
        broker_type: &str,
        context: BrokerContext,
    ) -> Result<Arc<dyn BrokerAdapter>, GatewayError> {
        let constructor = self
            .lookup(broker_type)
            .ok_or_else(|| GatewayError::UnknownBroker(broker_type.to_string()))?;
        Ok(constructor(context))
    }

    pub fn contains(&self, broker_type: &str) -> bool {
        self.lookup(broker_type).is_some()
    }

    /// Registered broker types in sorted order.
    pub fn broker_types(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    fn lookup(&self, broker_type: &str) -> Option<BrokerConstructor> {
        let normalized = broker_type.trim().to_ascii_lowercase();
        self.constructors.get(normalized.as_str()).copied()
    }
}
