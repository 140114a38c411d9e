use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::exchange_time::serde_datetime;

/// One OHLCV(+open interest) bucket of a historical series.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Exchange-local start of the bucket
    #[serde(with = "serde_datetime")]
    pub datetime: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    #[serde(rename = "oi")]
    pub open_interest: i64,
}
