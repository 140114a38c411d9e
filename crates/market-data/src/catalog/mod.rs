//! Instrument master catalog.
//!
//! An [`InstrumentCatalog`] is an immutable snapshot of one broker's instrument list.
//! It maps the caller-facing `(exchange, exchange_token, instrument_type)` triple to the
//! broker's opaque instrument key and back. Catalogs are rebuilt wholesale on every
//! adapter `initialize()` and never mutated afterwards.

mod feed;
mod index_symbols;

pub use feed::{decode_rows, FeedFormat, FeedRow, RawFeed};
pub use index_symbols::{index_symbol, UPSTOX_INDEX_KEYS};

use std::collections::HashMap;

use log::{debug, info};

use crate::errors::GatewayError;
use crate::models::{Instrument, InstrumentRef, SymbolInfo};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TripleKey {
    exchange: String,
    exchange_token: String,
    instrument_type: String,
}

impl TripleKey {
    fn new(exchange: &str, exchange_token: &str, instrument_type: &str) -> Self {
        Self {
            exchange: exchange.to_string(),
            exchange_token: exchange_token.to_string(),
            instrument_type: instrument_type.to_string(),
        }
    }
}

/// Immutable instrument lookup tables for one broker.
#[derive(Clone, Debug, Default)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
    by_triple: HashMap<TripleKey, usize>,
    by_key: HashMap<String, usize>,
}

impl InstrumentCatalog {
    /// Decodes a raw feed and builds the lookup tables.
    ///
    /// `backfill` lists index instrument keys whose rows ship without a trading symbol
    /// (see [`UPSTOX_INDEX_KEYS`]). Fails with `DataUnavailable` when the feed cannot be
    /// decoded or contains no usable row.
    pub fn load<R: FeedRow>(
        broker: &str,
        feed: &RawFeed,
        backfill: &[&str],
    ) -> Result<Self, GatewayError> {
        let rows: Vec<R> =
            decode_rows(feed).map_err(|message| GatewayError::data_unavailable(broker, message))?;
        let total = rows.len();

        let instruments: Vec<Instrument> = rows
            .into_iter()
            .filter_map(FeedRow::into_instrument)
            .map(|mut instrument| {
                if instrument.trading_symbol.trim().is_empty() {
                    if let Some(symbol) = index_symbol(backfill, &instrument.instrument_key) {
                        instrument.trading_symbol = symbol;
                    }
                }
                instrument
            })
            .collect();

        if instruments.is_empty() {
            return Err(GatewayError::data_unavailable(
                broker,
                "Instrument feed contained no usable rows",
            ));
        }

        let catalog = Self::from_instruments(instruments);
        info!(
            "Loaded {} instruments for {} ({} rows skipped)",
            catalog.len(),
            broker,
            total - catalog.len()
        );
        Ok(catalog)
    }

    /// Builds a catalog from already-decoded rows.
    ///
    /// Rows with an empty instrument key are skipped. When two rows share a triple or
    /// an instrument key, the first one wins.
    pub fn from_instruments(rows: impl IntoIterator<Item = Instrument>) -> Self {
        let mut catalog = Self::default();

        for instrument in rows {
            if instrument.instrument_key.is_empty() {
                continue;
            }
            if catalog.by_key.contains_key(&instrument.instrument_key) {
                debug!("Duplicate instrument key {}", instrument.instrument_key);
                continue;
            }

            let triple = TripleKey::new(
                &instrument.exchange,
                &instrument.exchange_token,
                &instrument.instrument_type,
            );
            let index = catalog.instruments.len();
            catalog.by_triple.entry(triple).or_insert(index);
            catalog
                .by_key
                .insert(instrument.instrument_key.clone(), index);
            catalog.instruments.push(instrument);
        }

        catalog
    }

    /// Resolves a caller triple to the broker's instrument key. Exact match only.
    pub fn resolve(
        &self,
        exchange: &str,
        exchange_token: &str,
        instrument_type: &str,
    ) -> Result<&str, GatewayError> {
        self.by_triple
            .get(&TripleKey::new(exchange, exchange_token, instrument_type))
            .map(|&index| self.instruments[index].instrument_key.as_str())
            .ok_or_else(|| {
                GatewayError::UnknownInstrument(format!(
                    "{}/{}/{}",
                    exchange, exchange_token, instrument_type
                ))
            })
    }

    /// Same as [`resolve`](Self::resolve) for an [`InstrumentRef`].
    pub fn resolve_ref(&self, instrument: &InstrumentRef) -> Result<&str, GatewayError> {
        self.resolve(
            &instrument.exchange,
            &instrument.exchange_token,
            &instrument.instrument_type,
        )
    }

    /// Maps a broker instrument key back to the caller-facing identifiers.
    pub fn reverse_resolve(&self, instrument_key: &str) -> Result<SymbolInfo, GatewayError> {
        self.get(instrument_key)
            .map(|instrument| SymbolInfo {
                trading_symbol: instrument.trading_symbol.clone(),
                instrument_type: instrument.instrument_type.clone(),
                exchange_token: instrument.exchange_token.clone(),
            })
            .ok_or_else(|| GatewayError::UnknownInstrument(instrument_key.to_string()))
    }

    /// Full catalog row for a broker instrument key.
    pub fn get(&self, instrument_key: &str) -> Option<&Instrument> {
        self.by_key
            .get(instrument_key)
            .map(|&index| &self.instruments[index])
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// All rows in feed order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn instrument(key: &str, exchange: &str, token: &str, kind: &str, symbol: &str) -> Instrument {
        Instrument {
            instrument_key: key.to_string(),
            exchange_token: token.to_string(),
            exchange: exchange.to_string(),
            instrument_type: kind.to_string(),
            trading_symbol: symbol.to_string(),
        }
    }

    #[derive(Deserialize)]
    struct Row {
        instrument_key: String,
        exchange: String,
        exchange_token: String,
        instrument_type: String,
        #[serde(default)]
        tradingsymbol: String,
    }

    impl FeedRow for Row {
        fn into_instrument(self) -> Option<Instrument> {
            if self.instrument_key.is_empty() {
                return None;
            }
            Some(instrument(
                &self.instrument_key,
                &self.exchange,
                &self.exchange_token,
                &self.instrument_type,
                &self.tradingsymbol,
            ))
        }
    }

    #[test]
    fn test_resolve_and_reverse_resolve() {
        let catalog = InstrumentCatalog::from_instruments(vec![instrument(
            "NSE_EQ|INE...|RELIANCE",
            "NSE",
            "2885",
            "EQ",
            "RELIANCE",
        )]);

        let key = catalog.resolve("NSE", "2885", "EQ").unwrap();
        assert_eq!(key, "NSE_EQ|INE...|RELIANCE");

        let info = catalog.reverse_resolve(key).unwrap();
        assert_eq!(info.exchange_token, "2885");
        assert_eq!(info.trading_symbol, "RELIANCE");
        assert_eq!(info.instrument_type, "EQ");
    }

    #[test]
    fn test_resolve_requires_exact_triple() {
        let catalog = InstrumentCatalog::from_instruments(vec![instrument(
            "NSE_EQ|INE002A01018",
            "NSE",
            "2885",
            "EQ",
            "RELIANCE",
        )]);

        assert!(matches!(
            catalog.resolve("BSE", "2885", "EQ"),
            Err(GatewayError::UnknownInstrument(_))
        ));
        assert!(matches!(
            catalog.resolve("NSE", "2885", "FUT"),
            Err(GatewayError::UnknownInstrument(_))
        ));
        assert!(matches!(
            catalog.resolve("nse", "2885", "EQ"),
            Err(GatewayError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_reverse_resolve_unknown_key() {
        let catalog = InstrumentCatalog::default();
        let err = catalog.reverse_resolve("NSE_EQ|GONE").unwrap_err();
        assert!(matches!(err, GatewayError::UnknownInstrument(key) if key == "NSE_EQ|GONE"));
    }

    #[test]
    fn test_first_row_wins_on_duplicates() {
        let catalog = InstrumentCatalog::from_instruments(vec![
            instrument("A", "NSE", "1", "EQ", "FIRST"),
            instrument("B", "NSE", "1", "EQ", "SECOND"),
            instrument("A", "BSE", "9", "EQ", "SHADOWED"),
            instrument("", "NSE", "2", "EQ", "NO_KEY"),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve("NSE", "1", "EQ").unwrap(), "A");
        assert_eq!(catalog.get("A").unwrap().trading_symbol, "FIRST");
        // B still reverse-resolves even though its triple is shadowed
        assert_eq!(catalog.reverse_resolve("B").unwrap().trading_symbol, "SECOND");
        assert!(catalog.resolve("BSE", "9", "EQ").is_err());

        // a shadowed row does not round-trip: its triple resolves to the first row
        let key = catalog.resolve("NSE", "1", "EQ").unwrap();
        assert_eq!(catalog.reverse_resolve(key).unwrap().trading_symbol, "FIRST");
        assert_ne!(key, "B");
    }

    #[test]
    fn test_load_backfills_index_symbols() {
        let json = br#"[
            {"instrument_key":"NSE_INDEX|Nifty 50","exchange":"NSE","exchange_token":"26000","instrument_type":"INDEX"},
            {"instrument_key":"NSE_INDEX|Unlisted","exchange":"NSE","exchange_token":"99","instrument_type":"INDEX"},
            {"instrument_key":"NSE_EQ|INE002A01018","exchange":"NSE","exchange_token":"2885","instrument_type":"EQ","tradingsymbol":"RELIANCE"}
        ]"#;
        let feed = RawFeed::new(FeedFormat::Json, json.to_vec());

        let catalog = InstrumentCatalog::load::<Row>("upstox", &feed, UPSTOX_INDEX_KEYS).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.reverse_resolve("NSE_INDEX|Nifty 50").unwrap().trading_symbol,
            "NIFTY 50"
        );
        assert_eq!(catalog.reverse_resolve("NSE_INDEX|Unlisted").unwrap().trading_symbol, "");
        assert_eq!(
            catalog.reverse_resolve("NSE_EQ|INE002A01018").unwrap().trading_symbol,
            "RELIANCE"
        );
    }

    #[test]
    fn test_load_empty_feed_is_unavailable() {
        let feed = RawFeed::new(FeedFormat::Json, b"[]".to_vec());
        let err = InstrumentCatalog::load::<Row>("upstox", &feed, &[]).unwrap_err();
        assert!(matches!(err, GatewayError::DataUnavailable { broker, .. } if broker == "upstox"));
    }

    #[test]
    fn test_load_malformed_feed_is_unavailable() {
        let feed = RawFeed::new(FeedFormat::GzipJson, b"not gzip".to_vec());
        let err = InstrumentCatalog::load::<Row>("upstox", &feed, &[]).unwrap_err();
        assert!(matches!(err, GatewayError::DataUnavailable { .. }));
    }
}
