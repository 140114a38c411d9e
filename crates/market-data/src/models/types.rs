use std::collections::HashMap;

use super::quote::Quote;

/// Broker type identifier used by the registry (e.g. "upstox", "zerodha").
pub type BrokerType = &'static str;

/// Exchange-assigned public token callers use to reference an instrument.
pub type ExchangeToken = String;

/// Provider-internal instrument identifier.
pub type InstrumentKey = String;

/// Quotes keyed by exchange token.
pub type QuoteMap = HashMap<ExchangeToken, Quote>;
