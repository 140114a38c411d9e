//! Payload shapes shared by the broker APIs.
//!
//! Both brokers wrap payloads in a `{status, data}` envelope, return quotes as a map
//! of display key to quote object, and return candles as positional arrays
//! `[timestamp, open, high, low, close, volume, oi]`.

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::GatewayError;
use crate::exchange_time::parse_timestamp;
use crate::models::{Candle, Ohlc, ProviderQuote};

/// `{status, data}` response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    /// Kite error message
    pub message: Option<String>,
    /// Upstox error list
    pub errors: Option<Vec<ApiErrorItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorItem {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }

    /// Best error text the envelope carries.
    pub fn error_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|e| {
                format!(
                    "{}{}",
                    e.error_code
                        .as_deref()
                        .map(|code| format!("{code}: "))
                        .unwrap_or_default(),
                    e.message.as_deref().unwrap_or("unknown error")
                )
            })
            .unwrap_or_else(|| format!("status={}", self.status))
    }
}

/// Quote object as returned by the LTP, OHLC and full-quote endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct WireQuote {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub instrument_token: Option<String>,
    pub last_price: Option<Decimal>,
    pub ohlc: Option<Ohlc>,
    #[serde(default, deserialize_with = "opt_lenient_i64")]
    pub volume: Option<i64>,
    #[serde(default, deserialize_with = "opt_lenient_i64")]
    pub oi: Option<i64>,
    pub average_price: Option<Decimal>,
    pub net_change: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub timestamp: Option<String>,
}

impl WireQuote {
    pub fn into_provider_quote(self) -> ProviderQuote {
        ProviderQuote {
            instrument_key: self.instrument_token,
            last_price: self.last_price,
            ohlc: self.ohlc,
            volume: self.volume,
            open_interest: self.oi,
            average_price: self.average_price,
            net_change: self.net_change,
            timestamp: self.timestamp.as_deref().and_then(parse_timestamp),
        }
    }
}

/// `data` of a historical candle response.
#[derive(Debug, Default, Deserialize)]
pub struct CandlesData {
    #[serde(default)]
    pub candles: Vec<Vec<Value>>,
}

/// Converts one positional candle array.
///
/// Open interest is optional (Kite only sends it with `oi=1`). Anything else missing
/// or mistyped is an upstream error.
pub fn parse_candle_row(broker: &str, row: &[Value]) -> Result<Candle, GatewayError> {
    let malformed = || GatewayError::upstream(broker, format!("Malformed candle row: {:?}", row));

    if row.len() < 6 {
        return Err(malformed());
    }

    let datetime = row[0]
        .as_str()
        .and_then(parse_timestamp)
        .ok_or_else(malformed)?;
    let price = |index: usize| value_decimal(&row[index]).ok_or_else(malformed);

    Ok(Candle {
        datetime,
        open: price(1)?,
        high: price(2)?,
        low: price(3)?,
        close: price(4)?,
        volume: value_i64(&row[5]).ok_or_else(malformed)?,
        open_interest: row.get(6).and_then(value_i64).unwrap_or(0),
    })
}

fn value_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Accepts `"2885"` as well as `2885`.
pub fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Optional variant of [`string_or_number`]; `null` maps to `None`.
pub fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Integer counts that occasionally arrive as floats (`0.0`) or strings.
pub fn opt_lenient_i64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_envelope_error_messages() {
        let kite: ApiEnvelope<Value> = serde_json::from_value(json!({
            "status": "error",
            "message": "Incorrect `api_key` or `access_token`.",
            "error_type": "TokenException"
        }))
        .unwrap();
        assert!(!kite.is_success());
        assert_eq!(kite.error_message(), "Incorrect `api_key` or `access_token`.");

        let upstox: ApiEnvelope<Value> = serde_json::from_value(json!({
            "status": "error",
            "errors": [{"errorCode": "UDAPI100050", "message": "Invalid token used to access API"}]
        }))
        .unwrap();
        assert_eq!(
            upstox.error_message(),
            "UDAPI100050: Invalid token used to access API"
        );
    }

    #[test]
    fn test_wire_quote_lenient_numbers() {
        let quote: WireQuote = serde_json::from_value(json!({
            "instrument_token": 408065,
            "last_price": 1412.95,
            "volume": "1024",
            "oi": 0.0,
            "timestamp": "2021-06-08 15:45:56",
            "ohlc": {"open": 1396, "high": 1421.75, "low": 1395.55, "close": 1389.65}
        }))
        .unwrap();

        let quote = quote.into_provider_quote();
        assert_eq!(quote.instrument_key.as_deref(), Some("408065"));
        assert_eq!(quote.last_price, Some(dec!(1412.95)));
        assert_eq!(quote.volume, Some(1024));
        assert_eq!(quote.open_interest, Some(0));
        assert_eq!(quote.ohlc.unwrap().high, dec!(1421.75));
        assert_eq!(
            quote.timestamp.unwrap().to_string(),
            "2021-06-08 15:45:56"
        );
    }

    #[test]
    fn test_parse_candle_row() {
        let row = json!(["2024-01-05T00:00:00+05:30", 2590.5, 2601, 2588.1, 2599.95, 120345, 0]);
        let candle = parse_candle_row("upstox", row.as_array().unwrap()).unwrap();
        assert_eq!(candle.open, dec!(2590.5));
        assert_eq!(candle.high, dec!(2601));
        assert_eq!(candle.volume, 120_345);
        assert_eq!(candle.datetime.to_string(), "2024-01-05 00:00:00");

        let short = json!(["2017-12-15T09:15:00+0530", 1704.5, 1705, 1699.25, 1702.8, 2499]);
        let candle = parse_candle_row("zerodha", short.as_array().unwrap()).unwrap();
        assert_eq!(candle.open_interest, 0);
        assert_eq!(candle.datetime.to_string(), "2017-12-15 09:15:00");
    }

    #[test]
    fn test_parse_candle_row_rejects_garbage() {
        let row = json!(["not a date", 1, 1, 1, 1, 1]);
        assert!(parse_candle_row("upstox", row.as_array().unwrap()).is_err());

        let row = json!(["2024-01-05T00:00:00+05:30", 1, 1]);
        assert!(parse_candle_row("upstox", row.as_array().unwrap()).is_err());
    }
}
