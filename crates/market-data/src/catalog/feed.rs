//! Raw instrument feed decoding.
//!
//! Brokers publish their master catalog as a bulk download: Upstox as gzip-compressed
//! JSON, Zerodha as plain CSV. [`RawFeed`] carries the downloaded bytes together with
//! their format; [`decode_rows`] turns them into provider row types implementing
//! [`FeedRow`].

use std::io::Read;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;

use crate::models::Instrument;

/// Encoding of a downloaded instrument feed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeedFormat {
    /// gzip-compressed JSON array
    GzipJson,
    /// Plain JSON array
    Json,
    /// CSV with a header row
    Csv,
}

/// Downloaded instrument feed bytes.
#[derive(Clone, Debug)]
pub struct RawFeed {
    pub format: FeedFormat,
    pub bytes: Vec<u8>,
}

impl RawFeed {
    pub fn new(format: FeedFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }
}

/// A provider-specific catalog row.
pub trait FeedRow: DeserializeOwned {
    /// Converts the row into a catalog instrument.
    /// Returns `None` for rows that cannot be addressed (e.g. no instrument key).
    fn into_instrument(self) -> Option<Instrument>;
}

/// Decodes the feed into provider rows.
///
/// Returns a plain message on failure; the catalog wraps it into
/// `GatewayError::DataUnavailable` with the broker name.
pub fn decode_rows<R: FeedRow>(feed: &RawFeed) -> Result<Vec<R>, String> {
    match feed.format {
        FeedFormat::GzipJson => {
            let mut json = Vec::new();
            GzDecoder::new(feed.bytes.as_slice())
                .read_to_end(&mut json)
                .map_err(|e| format!("Failed to decompress feed: {}", e))?;
            parse_json(&json)
        }
        FeedFormat::Json => parse_json(&feed.bytes),
        FeedFormat::Csv => parse_csv(&feed.bytes),
    }
}

fn parse_json<R: FeedRow>(bytes: &[u8]) -> Result<Vec<R>, String> {
    serde_json::from_slice(bytes).map_err(|e| format!("Failed to parse JSON feed: {}", e))
}

fn parse_csv<R: FeedRow>(bytes: &[u8]) -> Result<Vec<R>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    reader
        .deserialize()
        .enumerate()
        .map(|(line, row)| row.map_err(|e| format!("Failed to parse CSV row {}: {}", line + 1, e)))
        .collect()
}
