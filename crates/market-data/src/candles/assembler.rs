//! Historical candle assembly.
//!
//! Chunked historical calls return one candle sub-sequence per date range. The
//! assembler concatenates them into a single strictly time-ascending sequence and, when
//! the request runs up to today, fills the not-yet-published session candle from a live
//! full-market quote.

use std::future::Future;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;

use crate::errors::GatewayError;
use crate::exchange_time;
use crate::models::{Candle, Quote};

/// Merges chunked candle sequences and appends the running session candle.
#[derive(Clone, Copy, Debug)]
pub struct CandleAssembler {
    today: NaiveDate,
}

impl CandleAssembler {
    /// Assembler for a fixed exchange date.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Assembler for the current exchange date.
    pub fn for_today() -> Self {
        Self::new(exchange_time::today())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Concatenates sub-sequences and sorts ascending by datetime.
    /// Duplicate timestamps keep the candle from the earliest chunk.
    pub fn merge(chunks: Vec<Vec<Candle>>) -> Vec<Candle> {
        let mut candles: Vec<Candle> = chunks.into_iter().flatten().collect();
        // stable sort, so the first occurrence stays ahead of later duplicates
        candles.sort_by_key(|candle| candle.datetime);
        candles.dedup_by_key(|candle| candle.datetime);
        candles
    }

    /// Whether the series ends today but has no candle dated today yet.
    pub fn needs_session_candle(&self, to_date: NaiveDate, candles: &[Candle]) -> bool {
        to_date == self.today
            && !candles
                .iter()
                .any(|candle| candle.datetime.date() == self.today)
    }

    /// Builds the synthetic session candle from a full-market quote.
    ///
    /// Returns `None` unless the quote carries OHLC and a timestamp, the close is
    /// positive and the quote is from today. Stale quotes on non-trading days fail the
    /// date check and are never appended.
    pub fn session_candle(&self, quote: &Quote) -> Option<Candle> {
        let ohlc = quote.ohlc.as_ref()?;
        let timestamp = quote.timestamp?;

        if ohlc.close <= Decimal::ZERO {
            debug!("Session quote for {} has no close yet", quote.exchange_token);
            return None;
        }
        if timestamp.date() != self.today {
            debug!(
                "Session quote for {} is stale ({})",
                quote.exchange_token, timestamp
            );
            return None;
        }

        Some(Candle {
            datetime: timestamp,
            open: ohlc.open,
            high: ohlc.high,
            low: ohlc.low,
            close: ohlc.close,
            volume: quote.volume.unwrap_or(0),
            open_interest: quote.open_interest.unwrap_or(0),
        })
    }

    /// Merges `chunks` and, when needed, appends the session candle built from the quote
    /// returned by `fetch_quote`.
    ///
    /// `fetch_quote` is called at most once. A failed, empty or malformed quote leaves
    /// the gap unfilled with a warning; it never fails the assembly.
    pub async fn assemble<F, Fut>(
        &self,
        chunks: Vec<Vec<Candle>>,
        to_date: NaiveDate,
        fetch_quote: F,
    ) -> Vec<Candle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Quote>, GatewayError>>,
    {
        let mut candles = Self::merge(chunks);
        if !self.needs_session_candle(to_date, &candles) {
            return candles;
        }

        match fetch_quote().await {
            Ok(Some(quote)) => match self.session_candle(&quote) {
                Some(candle) => {
                    candles.push(candle);
                    candles = Self::merge(vec![candles]);
                }
                None => warn!(
                    "Session quote for {} is not usable, leaving today's candle out",
                    quote.exchange_token
                ),
            },
            Ok(None) => warn!("No session quote returned, leaving today's candle out"),
            Err(e) => warn!("Failed to fetch session quote: {}", e),
        }

        candles
    }
}
