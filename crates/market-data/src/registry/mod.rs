//! Broker registry module.
//!
//! Maps broker type identifiers (`"upstox"`, `"zerodha"`) to adapter constructors.

mod broker_registry;

pub use broker_registry::{BrokerConstructor, BrokerContext, BrokerRegistry};
