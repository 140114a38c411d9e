//! Zerodha (Kite Connect v3) broker adapter.
//!
//! Kite addresses instruments by numeric `instrument_token` internally but quotes
//! them as `EXCHANGE:TRADINGSYMBOL`, so quote requests are built from the catalog
//! and responses are mapped back through the `instrument_token` each quote carries.
//!
//! API documentation: https://kite.trade/docs/connect/v3/

mod models;

pub use models::KiteInstrumentRow;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};

use super::capabilities::{require_ohlc_interval, EndpointLimits, QuoteEndpoint};
use super::http::{ApiClient, Headers};
use super::session::{BrokerSession, SessionSlot};
use super::traits::BrokerAdapter;
use super::wire::{parse_candle_row, CandlesData, WireQuote};
use crate::batching::{chunk_date_range, chunk_keys, run_sequential, BatchOutcome, DateRange};
use crate::candles::CandleAssembler;
use crate::catalog::{FeedFormat, InstrumentCatalog, RawFeed};
use crate::config::BrokerConfig;
use crate::errors::GatewayError;
use crate::lifecycle::TokenStore;
use crate::models::{Candle, InstrumentRef, ProviderQuote, QuoteMap};

pub const BROKER_TYPE: &str = "zerodha";

pub const LIMITS: EndpointLimits = EndpointLimits {
    ltp_batch: 750,
    ohlc_batch: 500,
    full_quote_batch: 500,
    historical_spans: &[
        ("minute", 60),
        ("3minute", 100),
        ("5minute", 100),
        ("10minute", 100),
        ("15minute", 200),
        ("30minute", 200),
        ("60minute", 400),
        ("day", 2000),
    ],
};

const KITE_VERSION: &str = "3";

/// Zerodha Kite adapter.
pub struct ZerodhaAdapter {
    config: BrokerConfig,
    api: ApiClient,
    token_store: Arc<dyn TokenStore>,
    session: SessionSlot,
}

impl ZerodhaAdapter {
    pub fn new(config: BrokerConfig, token_store: Arc<dyn TokenStore>) -> Self {
        let api = ApiClient::new(BROKER_TYPE, &config.base_url, config.request_timeout);
        Self {
            config,
            api,
            token_store,
            session: SessionSlot::new(BROKER_TYPE),
        }
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GatewayError::auth(BROKER_TYPE, "Kite API key is not configured"))
    }

    fn auth_headers(&self, access_token: &str) -> Result<Headers, GatewayError> {
        Ok(vec![
            (
                "Authorization",
                format!("token {}:{}", self.api_key()?, access_token),
            ),
            ("X-Kite-Version", KITE_VERSION.to_string()),
        ])
    }

    /// Kite instrument tokens are plain integers.
    fn is_instrument_token(key: &str) -> bool {
        !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
    }

    async fn load_session(&self) -> Result<BrokerSession, GatewayError> {
        let token = self
            .token_store
            .get_current_token()
            .await?
            .filter(|token| self.token_store.is_token_valid(token))
            .ok_or_else(|| GatewayError::auth(BROKER_TYPE, "No valid access token in store"))?;
        let headers = self.auth_headers(&token)?;

        let bytes = self
            .api
            .download(&self.config.instruments_url, &headers)
            .await
            .map_err(|e| GatewayError::data_unavailable(BROKER_TYPE, e.to_string()))?;
        let catalog = InstrumentCatalog::load::<KiteInstrumentRow>(
            BROKER_TYPE,
            &RawFeed::new(FeedFormat::Csv, bytes),
            &[],
        )?;

        Ok(BrokerSession::new(token, catalog))
    }

    async fn quotes(
        &self,
        endpoint: QuoteEndpoint,
        instruments: &[InstrumentRef],
    ) -> Result<QuoteMap, GatewayError> {
        let session = self.session.current().await?;
        let keys = session.resolve_all(instruments)?;
        if keys.is_empty() {
            return Ok(QuoteMap::new());
        }

        let path = match endpoint {
            QuoteEndpoint::Ltp => "/quote/ltp",
            QuoteEndpoint::Ohlc => "/quote/ohlc",
            QuoteEndpoint::FullQuote => "/quote",
        };
        let headers = self.auth_headers(session.access_token())?;
        let catalog = session.catalog().clone();
        let batches = chunk_keys(&keys, LIMITS.batch_size(endpoint));
        debug!(
            "zerodha {}: {} instruments in {} batches",
            endpoint,
            keys.len(),
            batches.len()
        );

        let results = run_sequential(BROKER_TYPE, batches, &self.config.batch_policy, |batch| {
            let query: Vec<(&str, String)> = batch
                .iter()
                .filter_map(|key| catalog.get(key))
                .map(|row| ("i", format!("{}:{}", row.exchange, row.trading_symbol)))
                .collect();
            let headers = &headers;
            async move {
                let data: Option<HashMap<String, WireQuote>> =
                    self.api.get_data(path, &query, headers).await?;
                Ok::<_, GatewayError>(match data {
                    Some(quotes) if !quotes.is_empty() => BatchOutcome::Data(quotes),
                    _ => BatchOutcome::Empty,
                })
            }
        })
        .await?;

        let raw: Vec<ProviderQuote> = results
            .into_iter()
            .flat_map(HashMap::into_values)
            .map(WireQuote::into_provider_quote)
            .collect();
        session.translate_quotes(BROKER_TYPE, raw, Self::is_instrument_token)
    }

    async fn candle_chunk(
        &self,
        instrument_token: &str,
        interval: &str,
        range: DateRange,
        headers: &Headers,
    ) -> Result<BatchOutcome<Vec<Candle>>, GatewayError> {
        let path = format!("/instruments/historical/{}/{}", instrument_token, interval);
        let query = [
            ("from", format!("{} 00:00:00", range.from.format("%Y-%m-%d"))),
            ("to", format!("{} 23:59:59", range.to.format("%Y-%m-%d"))),
            ("oi", "1".to_string()),
        ];

        let data: Option<CandlesData> = self.api.get_data(&path, &query, headers).await?;
        let rows = data.map(|d| d.candles).unwrap_or_default();
        if rows.is_empty() {
            return Ok(BatchOutcome::Empty);
        }

        rows.iter()
            .map(|row| parse_candle_row(BROKER_TYPE, row))
            .collect::<Result<Vec<_>, _>>()
            .map(BatchOutcome::Data)
    }
}

#[async_trait]
impl BrokerAdapter for ZerodhaAdapter {
    fn broker_type(&self) -> &'static str {
        BROKER_TYPE
    }

    fn limits(&self) -> &EndpointLimits {
        &LIMITS
    }

    fn probe_instrument(&self) -> InstrumentRef {
        self.config
            .probe_instrument
            .clone()
            .unwrap_or_else(|| InstrumentRef::new("NSE", "1001", "INDEX"))
    }

    async fn initialize(&self) -> Result<(), GatewayError> {
        info!("Initializing {} adapter", BROKER_TYPE);
        self.session.initialize_with(|| self.load_session()).await
    }

    async fn ltp_quote(&self, instruments: &[InstrumentRef]) -> Result<QuoteMap, GatewayError> {
        self.quotes(QuoteEndpoint::Ltp, instruments).await
    }

    /// Kite's OHLC endpoint always reports the current session. `interval` is validated
    /// like every other broker's and otherwise not sent.
    async fn ohlc_quote(
        &self,
        instruments: &[InstrumentRef],
        interval: &str,
    ) -> Result<QuoteMap, GatewayError> {
        require_ohlc_interval(interval)?;
        self.quotes(QuoteEndpoint::Ohlc, instruments).await
    }

    async fn full_market_quote(
        &self,
        instruments: &[InstrumentRef],
    ) -> Result<QuoteMap, GatewayError> {
        self.quotes(QuoteEndpoint::FullQuote, instruments).await
    }

    async fn historical_candles(
        &self,
        instrument: &InstrumentRef,
        interval: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<Vec<Candle>, GatewayError> {
        let max_days = LIMITS.max_days_for(interval)?;
        let ranges = chunk_date_range(from_date, to_date, max_days)?;

        let session = self.session.current().await?;
        let instrument_token = session.resolve_one(instrument)?;
        let headers = self.auth_headers(session.access_token())?;

        let chunks = run_sequential(BROKER_TYPE, ranges, &self.config.batch_policy, |range| {
            self.candle_chunk(&instrument_token, interval, range, &headers)
        })
        .await?;

        let candles = CandleAssembler::for_today()
            .assemble(chunks, to_date, || async {
                let mut quotes = self
                    .full_market_quote(std::slice::from_ref(instrument))
                    .await?;
                Ok::<_, GatewayError>(quotes.remove(&instrument.exchange_token))
            })
            .await;

        Ok(candles)
    }

    async fn catalog(&self) -> Result<Arc<InstrumentCatalog>, GatewayError> {
        Ok(self.session.current().await?.catalog().clone())
    }
}
