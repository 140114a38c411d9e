//! Property-based tests for instrument resolution.

use proptest::prelude::*;
use std::collections::HashSet;

use brokerbridge_market_data::catalog::InstrumentCatalog;
use brokerbridge_market_data::Instrument;

// =============================================================================
// Generators
// =============================================================================

fn arb_exchange() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("NSE".to_string()),
        Just("BSE".to_string()),
        Just("NFO".to_string()),
        Just("MCX".to_string()),
    ]
}

fn arb_instrument_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("EQ".to_string()),
        Just("FUT".to_string()),
        Just("CE".to_string()),
        Just("PE".to_string()),
        Just("INDEX".to_string()),
    ]
}

/// Generates a catalog row. Keys and symbols may collide across rows.
fn arb_instrument() -> impl Strategy<Value = Instrument> {
    (
        arb_exchange(),
        arb_instrument_type(),
        1u32..5_000,        // exchange_token
        "[A-Z0-9]{3,12}",   // isin-ish key suffix
        "[A-Z]{2,10}",      // trading symbol
    )
        .prop_map(|(exchange, instrument_type, token, suffix, symbol)| Instrument {
            instrument_key: format!("{}_{}|{}", exchange, instrument_type, suffix),
            exchange_token: token.to_string(),
            exchange,
            instrument_type,
            trading_symbol: symbol,
        })
}

/// Drops rows whose instrument key already appeared.
fn first_per_key(rows: Vec<Instrument>) -> Vec<Instrument> {
    let mut keys = HashSet::new();
    rows.into_iter()
        .filter(|row| keys.insert(row.instrument_key.clone()))
        .collect()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every triple resolves to the key of the first row carrying it, and that key
    /// reverse-resolves to the same exchange token.
    #[test]
    fn prop_resolve_then_reverse_round_trips(
        rows in proptest::collection::vec(arb_instrument(), 1..200),
    ) {
        let rows = first_per_key(rows);
        let catalog = InstrumentCatalog::from_instruments(rows.clone());
        prop_assert_eq!(catalog.len(), rows.len());

        let mut seen_triples = HashSet::new();
        for row in &rows {
            let first_for_triple = seen_triples.insert((
                row.exchange.clone(),
                row.exchange_token.clone(),
                row.instrument_type.clone(),
            ));

            let key = catalog
                .resolve(&row.exchange, &row.exchange_token, &row.instrument_type)
                .unwrap();
            if first_for_triple {
                prop_assert_eq!(key, row.instrument_key.as_str());
            }

            let info = catalog.reverse_resolve(key).unwrap();
            let owner = catalog.get(key).unwrap();
            prop_assert_eq!(&info.exchange_token, &owner.exchange_token);
            prop_assert_eq!(&info.trading_symbol, &owner.trading_symbol);
        }
    }

    /// A triple absent from every row never resolves.
    #[test]
    fn prop_unknown_triple_fails(
        rows in proptest::collection::vec(arb_instrument(), 0..50),
    ) {
        let catalog = InstrumentCatalog::from_instruments(rows);
        prop_assert!(catalog.resolve("NSE", "999999", "EQ").is_err());
        prop_assert!(catalog.reverse_resolve("NSE_EQ|NOT-LISTED").is_err());
    }
}
