use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::instrument::SymbolInfo;
use crate::exchange_time::serde_opt_datetime;

/// Open/high/low/close prices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// A quote as the broker returned it, still keyed by the provider instrument key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderQuote {
    /// Provider instrument key reported in the payload (`None` when the payload lacked it)
    pub instrument_key: Option<String>,
    pub last_price: Option<Decimal>,
    pub ohlc: Option<Ohlc>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
    pub average_price: Option<Decimal>,
    pub net_change: Option<Decimal>,
    pub timestamp: Option<NaiveDateTime>,
}

/// Market quote for one instrument, keyed by exchange token in responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub exchange_token: String,
    pub trading_symbol: String,
    pub instrument_type: String,
    pub instrument_key: String,

    /// Last traded price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,

    /// Running session OHLC (OHLC and full quotes only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ohlc: Option<Ohlc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,

    #[serde(rename = "oi", skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_change: Option<Decimal>,

    /// Exchange-local time of the quote
    #[serde(
        default,
        with = "serde_opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<NaiveDateTime>,
}

impl Quote {
    /// Attach reverse-resolved symbol information to a provider quote.
    pub fn from_provider(instrument_key: String, symbol: SymbolInfo, raw: ProviderQuote) -> Self {
        Self {
            exchange_token: symbol.exchange_token,
            trading_symbol: symbol.trading_symbol,
            instrument_type: symbol.instrument_type,
            instrument_key,
            last_price: raw.last_price,
            ohlc: raw.ohlc,
            volume: raw.volume,
            open_interest: raw.open_interest,
            average_price: raw.average_price,
            net_change: raw.net_change,
            timestamp: raw.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_from_provider() {
        let raw = ProviderQuote {
            instrument_key: Some("NSE_EQ|INE002A01018".to_string()),
            last_price: Some(dec!(2950.55)),
            ..Default::default()
        };
        let symbol = SymbolInfo {
            trading_symbol: "RELIANCE".to_string(),
            instrument_type: "EQ".to_string(),
            exchange_token: "2885".to_string(),
        };

        let quote = Quote::from_provider("NSE_EQ|INE002A01018".to_string(), symbol, raw);
        assert_eq!(quote.exchange_token, "2885");
        assert_eq!(quote.trading_symbol, "RELIANCE");
        assert_eq!(quote.last_price, Some(dec!(2950.55)));
        assert!(quote.ohlc.is_none());
    }

    #[test]
    fn test_quote_serialization_skips_missing_fields() {
        let quote = Quote {
            exchange_token: "2885".to_string(),
            trading_symbol: "RELIANCE".to_string(),
            instrument_type: "EQ".to_string(),
            instrument_key: "NSE_EQ|INE002A01018".to_string(),
            last_price: Some(dec!(2950.55)),
            ohlc: None,
            volume: None,
            open_interest: Some(0),
            average_price: None,
            net_change: None,
            timestamp: None,
        };
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["oi"], 0);
        assert!(json.get("ohlc").is_none());
        assert!(json.get("timestamp").is_none());
    }
}
