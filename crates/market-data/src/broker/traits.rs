//! Broker adapter trait definition.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::capabilities::EndpointLimits;
use crate::catalog::InstrumentCatalog;
use crate::errors::GatewayError;
use crate::models::{Candle, InstrumentRef, QuoteMap};

/// Market data capabilities every broker provides.
///
/// Instruments are always addressed by [`InstrumentRef`]; adapters translate them to
/// their own instrument keys through the catalog loaded by [`initialize`]. Every
/// reference is resolved before the first request goes out, and one unresolvable
/// reference fails the whole call with `InvalidRequest`.
///
/// [`initialize`]: BrokerAdapter::initialize
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Registry identifier, e.g. `"upstox"`.
    fn broker_type(&self) -> &'static str;

    /// Batch and day-span bounds of this broker's endpoints.
    fn limits(&self) -> &EndpointLimits;

    /// Always-listed instrument the health probe asks for.
    fn probe_instrument(&self) -> InstrumentRef;

    /// Loads the stored access token and a fresh catalog, then swaps both in as one
    /// snapshot. Idempotent. On failure the previous snapshot (if any) stays active.
    async fn initialize(&self) -> Result<(), GatewayError>;

    /// Last traded prices keyed by exchange token.
    async fn ltp_quote(&self, instruments: &[InstrumentRef]) -> Result<QuoteMap, GatewayError>;

    /// Running OHLC keyed by exchange token.
    async fn ohlc_quote(
        &self,
        instruments: &[InstrumentRef],
        interval: &str,
    ) -> Result<QuoteMap, GatewayError>;

    /// Full market quotes keyed by exchange token.
    async fn full_market_quote(
        &self,
        instruments: &[InstrumentRef],
    ) -> Result<QuoteMap, GatewayError>;

    /// Time-ascending candles for `[from_date, to_date]`, both inclusive.
    async fn historical_candles(
        &self,
        instrument: &InstrumentRef,
        interval: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<Candle>, GatewayError>;

    /// Catalog of the current snapshot.
    async fn catalog(&self) -> Result<Arc<InstrumentCatalog>, GatewayError>;
}
