//! Kite Connect payloads.

use serde::Deserialize;

use crate::catalog::FeedRow;
use crate::models::Instrument;

/// One row of the `/instruments` CSV dump.
///
/// `instrument_token,exchange_token,tradingsymbol,name,last_price,expiry,strike,
/// tick_size,lot_size,instrument_type,segment,exchange`
#[derive(Debug, Deserialize)]
pub struct KiteInstrumentRow {
    pub instrument_token: String,
    pub exchange_token: String,
    pub tradingsymbol: String,
    #[serde(default)]
    pub instrument_type: String,
    #[serde(default)]
    pub segment: String,
    pub exchange: String,
}

impl FeedRow for KiteInstrumentRow {
    fn into_instrument(self) -> Option<Instrument> {
        if self.instrument_token.is_empty() {
            return None;
        }

        // index rows are typed EQ in the dump; only the segment tells them apart
        let instrument_type = if self.segment == "INDICES" {
            "INDEX".to_string()
        } else {
            self.instrument_type
        };

        Some(Instrument {
            instrument_key: self.instrument_token,
            exchange_token: self.exchange_token,
            exchange: self.exchange,
            instrument_type,
            trading_symbol: self.tradingsymbol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{decode_rows, FeedFormat, RawFeed};

    const CSV: &str = "instrument_token,exchange_token,tradingsymbol,name,last_price,expiry,strike,tick_size,lot_size,instrument_type,segment,exchange\n\
256265,1001,NIFTY 50,NIFTY 50,0,,0,0,0,EQ,INDICES,NSE\n\
738561,2885,RELIANCE,RELIANCE INDUSTRIES,0,,0,0.05,1,EQ,NSE,NSE\n\
12345602,48225,NIFTY24JANFUT,NIFTY,0,2024-01-25,0,0.05,50,FUT,NFO-FUT,NFO\n";

    #[test]
    fn test_rows_from_csv() {
        let feed = RawFeed::new(FeedFormat::Csv, CSV.as_bytes().to_vec());
        let rows: Vec<KiteInstrumentRow> = decode_rows(&feed).unwrap();
        let instruments: Vec<Instrument> =
            rows.into_iter().filter_map(FeedRow::into_instrument).collect();

        assert_eq!(instruments.len(), 3);
        assert_eq!(instruments[0].instrument_key, "256265");
        assert_eq!(instruments[0].exchange_token, "1001");
        assert_eq!(instruments[0].instrument_type, "INDEX");
        assert_eq!(instruments[1].instrument_type, "EQ");
        assert_eq!(instruments[1].trading_symbol, "RELIANCE");
        assert_eq!(instruments[2].exchange, "NFO");
        assert_eq!(instruments[2].instrument_type, "FUT");
    }
}
