use std::{collections::HashMap, path::PathBuf, time::Duration};

use brokerbridge_market_data::{BrokerConfig, LifecycleConfig};

const DEFAULT_BROKERS: &str = "upstox";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
const DEFAULT_TOKEN_FILE: &str = "./data/tokens.json";
const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 120;

/// Per-broker overrides read from `BB_<BROKER>_*`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrokerSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub instruments_url: Option<String>,
    /// Shell command that performs the login and prints the access token.
    pub login_cmd: Option<String>,
}

impl BrokerSettings {
    /// Applies the overrides on top of `config`.
    pub fn apply(&self, mut config: BrokerConfig) -> BrokerConfig {
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(url) = &self.instruments_url {
            config = config.with_instruments_url(url);
        }
        config
    }
}

pub struct Config {
    pub brokers: Vec<String>,
    pub health_check_interval: Duration,
    pub token_file: PathBuf,
    /// Base64 key that encrypts the token file at rest.
    pub token_key: Option<String>,
    pub login_timeout: Duration,
    pub log_format: String,
    pub broker_settings: HashMap<String, BrokerSettings>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let brokers: Vec<String> = var("BB_BROKERS")
            .unwrap_or_else(|| DEFAULT_BROKERS.into())
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let check_secs: u64 = var("BB_HEALTH_CHECK_INTERVAL_SECS")
            .and_then(|v| v.trim().parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);
        let login_secs: u64 = var("BB_LOGIN_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS);

        let broker_settings = brokers
            .iter()
            .map(|broker| {
                let prefix = format!("BB_{}", broker.to_ascii_uppercase());
                let settings = BrokerSettings {
                    api_key: var(&format!("{prefix}_API_KEY")),
                    base_url: var(&format!("{prefix}_BASE_URL")),
                    instruments_url: var(&format!("{prefix}_INSTRUMENTS_URL")),
                    login_cmd: var(&format!("{prefix}_LOGIN_CMD")),
                };
                (broker.clone(), settings)
            })
            .collect();

        Self {
            brokers,
            health_check_interval: Duration::from_secs(check_secs),
            token_file: PathBuf::from(
                var("BB_TOKEN_FILE").unwrap_or_else(|| DEFAULT_TOKEN_FILE.into()),
            ),
            token_key: var("BB_TOKEN_KEY"),
            login_timeout: Duration::from_secs(login_secs),
            log_format: var("BB_LOG_FORMAT").unwrap_or_else(|| "text".into()),
            broker_settings,
        }
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig::default().with_check_interval(self.health_check_interval)
    }

    pub fn settings_for(&self, broker: &str) -> BrokerSettings {
        self.broker_settings.get(broker).cloned().unwrap_or_default()
    }
}
