//! Upstox adapter against a mocked HTTP API.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use flate2::write::GzEncoder;
use flate2::Compression;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brokerbridge_market_data::batching::BatchPolicy;
use brokerbridge_market_data::exchange_time;
use brokerbridge_market_data::{
    BrokerAdapter, BrokerConfig, GatewayError, InstrumentRef, TokenStore, UpstoxAdapter,
};

const TOKEN: &str = "eyJ0eXAiOiJKV1QiLCJrZXlfaWQiOiJza192MS4wIn0.test";

struct MemoryStore(Mutex<Option<String>>);

impl MemoryStore {
    fn with_token(token: &str) -> Arc<Self> {
        Arc::new(Self(Mutex::new(Some(token.to_string()))))
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_current_token(&self) -> Result<Option<String>, GatewayError> {
        Ok(self.0.lock().unwrap().clone())
    }

    async fn store_token(&self, token: &str) -> Result<bool, GatewayError> {
        *self.0.lock().unwrap() = Some(token.to_string());
        Ok(true)
    }
}

fn gzip(value: &Value) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(serde_json::to_vec(value).unwrap().as_slice())
        .unwrap();
    encoder.finish().unwrap()
}

fn standard_feed() -> Value {
    json!([
        {
            "segment": "NSE_EQ",
            "exchange": "NSE",
            "instrument_type": "EQUITY",
            "instrument_key": "NSE_EQ|INE002A01018",
            "exchange_token": "2885",
            "trading_symbol": "RELIANCE"
        },
        {
            "segment": "NSE_EQ",
            "exchange": "NSE",
            "instrument_type": "EQUITY",
            "instrument_key": "NSE_EQ|INE009A01021",
            "exchange_token": "1594",
            "trading_symbol": "INFY"
        },
        {
            "segment": "NSE_INDEX",
            "exchange": "NSE",
            "instrument_type": "INDEX",
            "instrument_key": "NSE_INDEX|Nifty 50",
            "exchange_token": "26000",
            "trading_symbol": ""
        }
    ])
}

fn bulk_feed(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| {
                json!({
                    "segment": "NSE_EQ",
                    "instrument_key": format!("NSE_EQ|INE{:06}X", i),
                    "exchange_token": (10_000 + i).to_string(),
                    "trading_symbol": format!("SYM{}", i)
                })
            })
            .collect(),
    )
}

async fn mount_feed(server: &MockServer, feed: &Value) {
    Mock::given(method("GET"))
        .and(path("/feed/complete.json.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(feed)))
        .mount(server)
        .await;
}

fn config(server: &MockServer) -> BrokerConfig {
    BrokerConfig::upstox()
        .with_base_url(server.uri())
        .with_instruments_url(format!("{}/feed/complete.json.gz", server.uri()))
        .with_batch_policy(BatchPolicy::immediate())
}

async fn ready_adapter(server: &MockServer, feed: &Value) -> UpstoxAdapter {
    mount_feed(server, feed).await;
    let adapter = UpstoxAdapter::new(config(server), MemoryStore::with_token(TOKEN));
    adapter.initialize().await.unwrap();
    adapter
}

fn reliance() -> InstrumentRef {
    InstrumentRef::new("NSE", "2885", "EQ")
}

fn success(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "success", "data": data }))
}

#[tokio::test]
async fn test_initialize_loads_gzip_catalog() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    let catalog = adapter.catalog().await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(
        catalog.resolve("NSE", "2885", "EQ").unwrap(),
        "NSE_EQ|INE002A01018"
    );

    let nifty = catalog.reverse_resolve("NSE_INDEX|Nifty 50").unwrap();
    assert_eq!(nifty.trading_symbol, "NIFTY 50");
    assert_eq!(nifty.exchange_token, "26000");
}

#[tokio::test]
async fn test_calls_before_initialize_fail() {
    let server = MockServer::start().await;
    let adapter = UpstoxAdapter::new(config(&server), MemoryStore::with_token(TOKEN));

    let err = adapter.ltp_quote(&[reliance()]).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotInitialized { .. }));
}

#[tokio::test]
async fn test_initialize_without_token_fails() {
    let server = MockServer::start().await;
    mount_feed(&server, &standard_feed()).await;
    let adapter = UpstoxAdapter::new(config(&server), Arc::new(MemoryStore(Mutex::new(None))));

    let err = adapter.initialize().await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthFailure { .. }));
}

#[tokio::test]
async fn test_initialize_with_broken_feed_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/feed/complete.json.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a feed".to_vec()))
        .mount(&server)
        .await;

    let err = adapter.initialize().await.unwrap_err();
    assert!(matches!(err, GatewayError::DataUnavailable { .. }));
    assert_eq!(adapter.catalog().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_ltp_quote_translates_keys() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    Mock::given(method("GET"))
        .and(path("/market-quote/ltp"))
        .and(query_param(
            "instrument_key",
            "NSE_EQ|INE002A01018,NSE_EQ|INE009A01021",
        ))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(success(json!({
            "NSE_EQ:RELIANCE": {
                "last_price": 2950.55,
                "instrument_token": "NSE_EQ|INE002A01018"
            },
            "NSE_EQ:INFY": {
                "last_price": 1510.2,
                "instrument_token": "NSE_EQ|INE009A01021"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quotes = adapter
        .ltp_quote(&[reliance(), InstrumentRef::new("NSE", "1594", "EQ")])
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    let quote = &quotes["2885"];
    assert_eq!(quote.trading_symbol, "RELIANCE");
    assert_eq!(quote.instrument_type, "EQ");
    assert_eq!(quote.last_price, Some(dec!(2950.55)));
    assert_eq!(quotes["1594"].trading_symbol, "INFY");
}

#[tokio::test]
async fn test_quote_with_key_missing_from_catalog_is_dropped() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    Mock::given(method("GET"))
        .and(path("/market-quote/ltp"))
        .respond_with(success(json!({
            "NSE_EQ:RELIANCE": {
                "last_price": 2950.55,
                "instrument_token": "NSE_EQ|INE002A01018"
            },
            "NSE_EQ:DELISTED": {
                "last_price": 1.0,
                "instrument_token": "NSE_EQ|INE999Z99999"
            }
        })))
        .mount(&server)
        .await;

    let quotes = adapter.ltp_quote(&[reliance()]).await.unwrap();
    assert_eq!(quotes.len(), 1);
    assert!(quotes.contains_key("2885"));
}

#[tokio::test]
async fn test_unresolved_instrument_fails_before_any_request() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    Mock::given(method("GET"))
        .and(path("/market-quote/ltp"))
        .respond_with(success(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let err = adapter
        .ltp_quote(&[reliance(), InstrumentRef::new("NSE", "424242", "EQ")])
        .await
        .unwrap_err();

    match err {
        GatewayError::InvalidRequest(message) => assert!(message.contains("NSE/424242/EQ")),
        other => panic!("expected InvalidRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ltp_for_1600_instruments_uses_three_batches() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &bulk_feed(1600)).await;

    Mock::given(method("GET"))
        .and(path("/market-quote/ltp"))
        .respond_with(success(json!({
            "NSE_EQ:SYM0": {
                "last_price": 100.5,
                "instrument_token": "NSE_EQ|INE000000X"
            }
        })))
        .expect(3)
        .mount(&server)
        .await;

    let refs: Vec<InstrumentRef> = (0..1600)
        .map(|i| InstrumentRef::new("NSE", (10_000 + i).to_string(), "EQ"))
        .collect();

    let quotes = adapter.ltp_quote(&refs).await.unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes["10000"].trading_symbol, "SYM0");
}

#[tokio::test]
async fn test_rate_limited_batch_stops_the_call() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    Mock::given(method("GET"))
        .and(path("/market-quote/ohlc"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = adapter.ohlc_quote(&[reliance()], "1d").await.unwrap_err();
    assert!(matches!(err, GatewayError::RateLimited { .. }));
}

#[tokio::test]
async fn test_ohlc_quote_requires_interval() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    let err = adapter.ohlc_quote(&[reliance()], " ").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidRequest(_)));
}

fn day(date: NaiveDate) -> String {
    format!("{}T00:00:00+05:30", date.format("%Y-%m-%d"))
}

#[tokio::test]
async fn test_historical_candles_are_merged_in_order() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/historical-candle/.+/day/2024-01-05/2024-01-01$"))
        .respond_with(success(json!({
            "candles": [
                ["2024-01-05T00:00:00+05:30", 2600.0, 2610.0, 2590.0, 2605.5, 1000, 0],
                ["2024-01-04T00:00:00+05:30", 2580.0, 2605.0, 2575.0, 2600.0, 900, 0],
                ["2024-01-04T00:00:00+05:30", 2580.0, 2605.0, 2575.0, 2600.0, 900, 0],
                ["2024-01-02T00:00:00+05:30", 2550.0, 2585.0, 2545.0, 2580.0, 800, 0]
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candles = adapter
        .historical_candles(
            &reliance(),
            "day",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(candles.len(), 3);
    assert!(candles.windows(2).all(|w| w[0].datetime < w[1].datetime));
    assert_eq!(candles[2].close, dec!(2605.5));
}

#[tokio::test]
async fn test_historical_chunk_error_aborts_whole_call() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    // 1minute spans 30 days: Jan 1-30 succeeds, Jan 31 fails
    Mock::given(method("GET"))
        .and(path_regex(r"^/historical-candle/.+/1minute/2024-01-30/2024-01-01$"))
        .respond_with(success(json!({
            "candles": [["2024-01-02T09:15:00+05:30", 1, 2, 0.5, 1.5, 10, 0]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/historical-candle/.+/1minute/2024-01-31/2024-01-31$"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = adapter
        .historical_candles(
            &reliance(),
            "1minute",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::UpstreamApi {
            status: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn test_historical_rejects_unsupported_interval() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    let err = adapter
        .historical_candles(
            &reliance(),
            "7minute",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_session_candle_is_appended_for_today() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    let today = exchange_time::today();
    let from = today - Duration::days(2);

    Mock::given(method("GET"))
        .and(path_regex(r"^/historical-candle/.+/day/"))
        .respond_with(success(json!({
            "candles": [
                [day(today - Duration::days(1)), 2600.0, 2610.0, 2590.0, 2605.0, 1000, 0],
                [day(from), 2580.0, 2605.0, 2575.0, 2600.0, 900, 0]
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market-quote/quotes"))
        .and(query_param("instrument_key", "NSE_EQ|INE002A01018"))
        .respond_with(success(json!({
            "NSE_EQ:RELIANCE": {
                "instrument_token": "NSE_EQ|INE002A01018",
                "last_price": 2620.0,
                "volume": 5000,
                "ohlc": { "open": 2606.0, "high": 2625.0, "low": 2601.0, "close": 2620.0 },
                "timestamp": format!("{}T15:29:59.963+05:30", today.format("%Y-%m-%d"))
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candles = adapter
        .historical_candles(&reliance(), "day", from, today)
        .await
        .unwrap();

    assert_eq!(candles.len(), 3);
    let session = candles.last().unwrap();
    assert_eq!(session.datetime.date(), today);
    assert_eq!(session.close, dec!(2620));
    assert_eq!(session.volume, 5000);
}

#[tokio::test]
async fn test_session_candle_skipped_when_quote_lacks_ohlc() {
    let server = MockServer::start().await;
    let adapter = ready_adapter(&server, &standard_feed()).await;

    let today = exchange_time::today();
    let from = today - Duration::days(1);

    Mock::given(method("GET"))
        .and(path_regex(r"^/historical-candle/.+/day/"))
        .respond_with(success(json!({
            "candles": [[day(from), 2580.0, 2605.0, 2575.0, 2600.0, 900, 0]]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market-quote/quotes"))
        .respond_with(success(json!({
            "NSE_EQ:RELIANCE": {
                "instrument_token": "NSE_EQ|INE002A01018",
                "last_price": 2620.0
            }
        })))
        .mount(&server)
        .await;

    let candles = adapter
        .historical_candles(&reliance(), "day", from, today)
        .await
        .unwrap();
    assert_eq!(candles.len(), 1);
}
