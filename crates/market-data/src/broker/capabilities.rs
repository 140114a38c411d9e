//! Per-endpoint request bounds.
//!
//! Brokers cap how many instruments one quote call may carry and how many days one
//! historical call may span. The caps differ per endpoint because URL length and result
//! size limits differ.

use crate::errors::GatewayError;

/// Quote endpoints with their own batch bound.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteEndpoint {
    Ltp,
    Ohlc,
    FullQuote,
}

impl std::fmt::Display for QuoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ltp => write!(f, "ltp"),
            Self::Ohlc => write!(f, "ohlc"),
            Self::FullQuote => write!(f, "full quote"),
        }
    }
}

/// Request bounds of one broker.
#[derive(Clone, Debug)]
pub struct EndpointLimits {
    /// Max instruments per LTP call.
    pub ltp_batch: usize,

    /// Max instruments per OHLC call.
    pub ohlc_batch: usize,

    /// Max instruments per full-quote call.
    pub full_quote_batch: usize,

    /// Supported historical intervals with the max day span per request.
    pub historical_spans: &'static [(&'static str, u32)],
}

impl EndpointLimits {
    pub fn batch_size(&self, endpoint: QuoteEndpoint) -> usize {
        match endpoint {
            QuoteEndpoint::Ltp => self.ltp_batch,
            QuoteEndpoint::Ohlc => self.ohlc_batch,
            QuoteEndpoint::FullQuote => self.full_quote_batch,
        }
    }

    /// Day span per historical request for `interval`.
    /// Unknown intervals are rejected before any request is built.
    pub fn max_days_for(&self, interval: &str) -> Result<u32, GatewayError> {
        self.historical_spans
            .iter()
            .find(|(name, _)| *name == interval)
            .map(|(_, days)| *days)
            .ok_or_else(|| {
                let supported: Vec<&str> =
                    self.historical_spans.iter().map(|(name, _)| *name).collect();
                GatewayError::InvalidRequest(format!(
                    "Unsupported interval '{}', expected one of: {}",
                    interval,
                    supported.join(", ")
                ))
            })
    }

    pub fn supports_interval(&self, interval: &str) -> bool {
        self.historical_spans.iter().any(|(name, _)| *name == interval)
    }
}

/// Rejects a blank OHLC interval before any request is built.
pub fn require_ohlc_interval(interval: &str) -> Result<(), GatewayError> {
    if interval.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "OHLC interval must not be empty".to_string(),
        ));
    }
    Ok(())
}
