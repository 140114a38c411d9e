//! Upstox broker adapter.
//!
//! - Catalog: gzip-compressed JSON master feed, index rows backfilled from
//!   [`UPSTOX_INDEX_KEYS`]
//! - Quotes via `/market-quote/ltp`, `/market-quote/ohlc` and `/market-quote/quotes`,
//!   with instrument keys joined into one comma-separated `instrument_key` parameter
//! - Candles via `/historical-candle/{key}/{interval}/{to}/{from}`
//!
//! API documentation: https://upstox.com/developer/api-documentation

mod models;

pub use models::UpstoxInstrumentRow;

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
use crate::catalog::{FeedFormat, InstrumentCatalog, RawFeed, UPSTOX_INDEX_KEYS};
use crate::config::BrokerConfig;
use crate::errors::GatewayError;
use crate::lifecycle::TokenStore;
use crate::models::{Candle, InstrumentRef, ProviderQuote, QuoteMap};

pub const BROKER_TYPE: &str = "upstox";

pub const LIMITS: EndpointLimits = EndpointLimits {
    ltp_batch: 750,
    ohlc_batch: 500,
    full_quote_batch: 500,
    historical_spans: &[
        ("1minute", 30),
        ("30minute", 30),
        ("day", 1000),
        ("week", 1000),
        ("month", 1000),
    ],
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upstox adapter.
pub struct UpstoxAdapter {
    config: BrokerConfig,
    api: ApiClient,
    token_store: Arc<dyn TokenStore>,
    session: SessionSlot,
}

impl UpstoxAdapter {
    pub fn new(config: BrokerConfig, token_store: Arc<dyn TokenStore>) -> Self {
        let api = ApiClient::new(BROKER_TYPE, &config.base_url, config.request_timeout);
        Self {
            config,
            api,
            token_store,
            session: SessionSlot::new(BROKER_TYPE),
        }
    }

    fn auth_headers(session: &BrokerSession) -> Headers {
        vec![
            ("Authorization", format!("Bearer {}", session.access_token())),
            ("Accept", "application/json".to_string()),
        ]
    }

    /// Upstox keys are `SEGMENT|IDENTIFIER`.
    fn is_instrument_key(key: &str) -> bool {
        matches!(key.split_once('|'), Some((segment, id)) if !segment.is_empty() && !id.is_empty())
    }

    async fn load_session(&self) -> Result<BrokerSession, GatewayError> {
        let token = self
            .token_store
            .get_current_token()
            .await?
            .filter(|token| self.token_store.is_token_valid(token))
            .ok_or_else(|| GatewayError::auth(BROKER_TYPE, "No valid access token in store"))?;

        let bytes = self
            .api
            .download(&self.config.instruments_url, &Vec::new())
            .await
            .map_err(|e| GatewayError::data_unavailable(BROKER_TYPE, e.to_string()))?;

        let format = if bytes.starts_with(&GZIP_MAGIC) {
            FeedFormat::GzipJson
        } else {
            FeedFormat::Json
        };
        let catalog = InstrumentCatalog::load::<UpstoxInstrumentRow>(
            BROKER_TYPE,
            &RawFeed::new(format, bytes),
            UPSTOX_INDEX_KEYS,
        )?;

        Ok(BrokerSession::new(token, catalog))
    }

    async fn quotes(
        &self,
        endpoint: QuoteEndpoint,
        instruments: &[InstrumentRef],
        interval: Option<&str>,
    ) -> Result<QuoteMap, GatewayError> {
        let session = self.session.current().await?;
        let keys = session.resolve_all(instruments)?;
        if keys.is_empty() {
            return Ok(QuoteMap::new());
        }

        let path = match endpoint {
            QuoteEndpoint::Ltp => "/market-quote/ltp",
            QuoteEndpoint::Ohlc => "/market-quote/ohlc",
            QuoteEndpoint::FullQuote => "/market-quote/quotes",
        };
        let headers = Self::auth_headers(&session);
        let batches = chunk_keys(&keys, LIMITS.batch_size(endpoint));
        debug!(
            "upstox {}: {} instruments in {} batches",
            endpoint,
            keys.len(),
            batches.len()
        );

        let results = run_sequential(BROKER_TYPE, batches, &self.config.batch_policy, |batch| {
            let mut query = vec![("instrument_key", batch.join(","))];
            if let Some(interval) = interval {
                query.push(("interval", interval.to_string()));
            }
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
        session.translate_quotes(BROKER_TYPE, raw, Self::is_instrument_key)
    }

    async fn candle_chunk(
        &self,
        instrument_key: &str,
        interval: &str,
        range: DateRange,
        headers: &Headers,
    ) -> Result<BatchOutcome<Vec<Candle>>, GatewayError> {
        let path = format!(
            "/historical-candle/{}/{}/{}/{}",
            urlencoding::encode(instrument_key),
            interval,
            range.to.format("%Y-%m-%d"),
            range.from.format("%Y-%m-%d")
        );

        let data: Option<CandlesData> = self.api.get_data(&path, &[], headers).await?;
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
impl BrokerAdapter for UpstoxAdapter {
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
            .unwrap_or_else(|| InstrumentRef::new("NSE", "26000", "INDEX"))
    }

    async fn initialize(&self) -> Result<(), GatewayError> {
        info!("Initializing {} adapter", BROKER_TYPE);
        self.session.initialize_with(|| self.load_session()).await
    }

    async fn ltp_quote(&self, instruments: &[InstrumentRef]) -> Result<QuoteMap, GatewayError> {
        self.quotes(QuoteEndpoint::Ltp, instruments, None).await
    }

    async fn ohlc_quote(
        &self,
        instruments: &[InstrumentRef],
        interval: &str,
    ) -> Result<QuoteMap, GatewayError> {
        require_ohlc_interval(interval)?;
        self.quotes(QuoteEndpoint::Ohlc, instruments, Some(interval))
            .await
    }

    async fn full_market_quote(
        &self,
        instruments: &[InstrumentRef],
    ) -> Result<QuoteMap, GatewayError> {
        self.quotes(QuoteEndpoint::FullQuote, instruments, None)
            .await
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
        let instrument_key = session.resolve_one(instrument)?;
        let headers = Self::auth_headers(&session);
        debug!(
            "upstox candles for {} ({}): {} chunks",
            instrument,
            interval,
            ranges.len()
        );

        let chunks = run_sequential(BROKER_TYPE, ranges, &self.config.batch_policy, |range| {
            self.candle_chunk(&instrument_key, interval, range, &headers)
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
