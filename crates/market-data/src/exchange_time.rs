//! Exchange-local time handling.
//!
//! Every supported broker lists instruments on Indian exchanges, so candle and quote
//! timestamps are normalized to naive `Asia/Kolkata` wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;

/// Time zone the exchanges trade in.
pub const EXCHANGE_TZ: Tz = Kolkata;

/// Wire format used for candle datetimes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Today's date on the exchange calendar.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&EXCHANGE_TZ).date_naive()
}

/// Converts an absolute instant into exchange-local wall-clock time.
pub fn to_exchange_local<T: TimeZone>(instant: &DateTime<T>) -> NaiveDateTime {
    instant.with_timezone(&EXCHANGE_TZ).naive_local()
}

/// Parses a broker timestamp into exchange-local time.
///
/// Accepts RFC 3339 (`2024-01-05T15:29:59.963+05:30`), offsets without a colon
/// (`2024-01-05T09:15:00+0530`), naive exchange-local strings (`2024-01-05 15:29:59`)
/// and epoch milliseconds (`1704448799963`). Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(to_exchange_local(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(to_exchange_local(&dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = raw.parse().ok()?;
        let dt = Utc.timestamp_millis_opt(millis).single()?;
        return Some(to_exchange_local(&dt));
    }

    None
}

/// Serde helpers for exchange-local datetimes in [`DATETIME_FORMAT`].
pub mod serde_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_timestamp, DATETIME_FORMAT};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
    }
}

/// Same as [`serde_datetime`] for optional values.
pub mod serde_opt_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_timestamp, DATETIME_FORMAT};

    pub fn serialize<S: Serializer>(
        dt: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}
