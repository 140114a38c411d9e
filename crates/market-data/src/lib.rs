//! BrokerBridge Market Data Crate
//!
//! This crate puts several Indian stock brokers behind one market data interface.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Broker-agnostic instrument addressing by `(exchange, exchange_token, instrument_type)`
//! - LTP, OHLC and full market quotes with automatic request batching
//! - Historical candles with date-range chunking and a synthetic session candle
//! - Background credential health checks with automatic rotation
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |     Caller       | --> |  InstrumentRef   |  (exchange, token, type)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |InstrumentCatalog |  (per-broker snapshot)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  BrokerAdapter   |  (Upstox, Zerodha)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | batching/candles |  (chunk, pace, merge)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  Quote / Candle  |  (market data)
//!                          +------------------+
//! ```
//!
//! [`TokenLifecycleManager`] runs beside the adapters and swaps in a fresh
//! `(access token, catalog)` snapshot whenever a broker's credential stops working.
//!
//! # Core Types
//!
//! - [`InstrumentRef`] - Caller-facing instrument reference
//! - [`InstrumentCatalog`] - Instrument master of one broker
//! - [`BrokerAdapter`] - Per-broker market data implementation
//! - [`Quote`] / [`Candle`] - Market data
//! - [`BrokerRegistry`] - Broker type to adapter constructor
//! - [`GatewayError`] - Error type of every operation

pub mod batching;
pub mod broker;
pub mod candles;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod exchange_time;
pub mod lifecycle;
pub mod models;
pub mod registry;

// Re-export all public types from models
pub use models::{
    BrokerType, Candle, ExchangeToken, Instrument, InstrumentKey, InstrumentRef, Ohlc,
    ProviderQuote, Quote, QuoteMap, SymbolInfo,
};

pub use broker::{BrokerAdapter, EndpointLimits, QuoteEndpoint, UpstoxAdapter, ZerodhaAdapter};
pub use catalog::InstrumentCatalog;
pub use config::BrokerConfig;
pub use errors::GatewayError;
pub use lifecycle::{
    Authenticator, BrokerState, BrokerStatus, LifecycleConfig, Rotator, TokenLifecycleManager,
    TokenRotator, TokenStore,
};
pub use registry::{BrokerContext, BrokerRegistry};
