//! Upstox API payloads.

use serde::Deserialize;

use crate::broker::wire::string_or_number;
use crate::catalog::FeedRow;
use crate::models::Instrument;

/// One entry of `complete.json.gz`.
///
/// The caller-facing triple uses the segment (`NSE_EQ`, `NSE_INDEX`, `MCX_FO`) split
/// into exchange and instrument type, so `NSE_EQ|INE002A01018` is addressed as
/// `NSE / 2885 / EQ`.
#[derive(Debug, Deserialize)]
pub struct UpstoxInstrumentRow {
    #[serde(default)]
    pub instrument_key: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub exchange_token: String,
    pub segment: Option<String>,
    pub exchange: Option<String>,
    pub instrument_type: Option<String>,
    #[serde(default, alias = "tradingsymbol")]
    pub trading_symbol: String,
}

impl FeedRow for UpstoxInstrumentRow {
    fn into_instrument(self) -> Option<Instrument> {
        if self.instrument_key.is_empty() {
            return None;
        }

        // older feeds carried the segment in `exchange`
        let segment = self
            .segment
            .as_deref()
            .or(self.exchange.as_deref().filter(|e| e.contains('_')))
            .and_then(|segment| segment.split_once('_'))
            .map(|(exchange, kind)| (exchange.to_string(), kind.to_string()));

        let (exchange, instrument_type) = match segment {
            Some(pair) => pair,
            None => (
                self.exchange.unwrap_or_default(),
                self.instrument_type.unwrap_or_default(),
            ),
        };

        Some(Instrument {
            instrument_key: self.instrument_key,
            exchange_token: self.exchange_token,
            exchange,
            instrument_type,
            trading_symbol: self.trading_symbol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_uses_segment() {
        let row: UpstoxInstrumentRow = serde_json::from_value(json!({
            "segment": "NSE_EQ",
            "name": "RELIANCE INDUSTRIES LTD",
            "exchange": "NSE",
            "isin": "INE002A01018",
            "instrument_type": "EQUITY",
            "instrument_key": "NSE_EQ|INE002A01018",
            "lot_size": 1,
            "exchange_token": "2885",
            "tick_size": 10.0,
            "trading_symbol": "RELIANCE"
        }))
        .unwrap();

        let instrument = row.into_instrument().unwrap();
        assert_eq!(instrument.exchange, "NSE");
        assert_eq!(instrument.instrument_type, "EQ");
        assert_eq!(instrument.exchange_token, "2885");
        assert_eq!(instrument.trading_symbol, "RELIANCE");
    }

    #[test]
    fn test_legacy_row_with_numeric_token() {
        let row: UpstoxInstrumentRow = serde_json::from_value(json!({
            "instrument_key": "NSE_INDEX|Nifty 50",
            "exchange_token": 26000,
            "tradingsymbol": "",
            "exchange": "NSE_INDEX",
            "instrument_type": "INDEX"
        }))
        .unwrap();

        let instrument = row.into_instrument().unwrap();
        assert_eq!(instrument.exchange, "NSE");
        assert_eq!(instrument.instrument_type, "INDEX");
        assert_eq!(instrument.exchange_token, "26000");
        assert_eq!(instrument.trading_symbol, "");
    }

    #[test]
    fn test_row_without_key_is_skipped() {
        let row: UpstoxInstrumentRow =
            serde_json::from_value(json!({"exchange_token": "1", "segment": "NSE_EQ"})).unwrap();
        assert!(row.into_instrument().is_none());
    }
}
