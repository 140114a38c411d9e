//! Per-broker connection settings.

use std::time::Duration;

use crate::batching::BatchPolicy;
use crate::models::InstrumentRef;

const UPSTOX_BASE_URL: &str = "https://api.upstox.com/v2";
const UPSTOX_INSTRUMENTS_URL: &str =
    "https://assets.upstox.com/market-quote/instruments/exchange/complete.json.gz";

const KITE_BASE_URL: &str = "https://api.kite.trade";
const KITE_INSTRUMENTS_URL: &str = "https://api.kite.trade/instruments";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings of one broker adapter.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// App key (Kite sends it with every request; Upstox ignores it).
    pub api_key: Option<String>,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Absolute URL of the instrument master feed.
    pub instruments_url: String,
    pub request_timeout: Duration,
    pub batch_policy: BatchPolicy,
    /// Overrides the adapter's built-in health-probe instrument.
    pub probe_instrument: Option<InstrumentRef>,
}

impl BrokerConfig {
    pub fn upstox() -> Self {
        Self {
            api_key: None,
            base_url: UPSTOX_BASE_URL.to_string(),
            instruments_url: UPSTOX_INSTRUMENTS_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            batch_policy: BatchPolicy::default(),
            probe_instrument: None,
        }
    }

    pub fn zerodha() -> Self {
        Self {
            api_key: None,
            base_url: KITE_BASE_URL.to_string(),
            instruments_url: KITE_INSTRUMENTS_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            batch_policy: BatchPolicy::default(),
            probe_instrument: None,
        }
    }

    /// Defaults for a registered broker type, `None` for unknown types.
    pub fn for_broker(broker_type: &str) -> Option<Self> {
        match broker_type.to_ascii_lowercase().as_str() {
            "upstox" => Some(Self::upstox()),
            "zerodha" => Some(Self::zerodha()),
            _ => None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Points the API at another root. The instrument feed URL is only moved along when
    /// it lived under the old root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if let Some(path) = self.instruments_url.strip_prefix(&self.base_url) {
            self.instruments_url = format!("{}{}", base_url, path);
        }
        self.base_url = base_url;
        self
    }

    pub fn with_instruments_url(mut self, url: impl Into<String>) -> Self {
        self.instruments_url = url.into();
        self
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_probe_instrument(mut self, instrument: InstrumentRef) -> Self {
        self.probe_instrument = Some(instrument);
        self
    }
}
