//! Credential and catalog snapshot of an adapter.
//!
//! The access token and the catalog it was loaded with form one [`BrokerSession`].
//! A [`SessionSlot`] holds the current session behind an async `RwLock`. Requests clone
//! the `Arc` and release the lock right away, so a rotation swaps in a new session
//! without tearing or cancelling requests already running against the old one.

use std::future::Future;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{Mutex, RwLock};

use crate::catalog::InstrumentCatalog;
use crate::errors::GatewayError;
use crate::models::{InstrumentRef, ProviderQuote, Quote, QuoteMap};

/// One access token together with the catalog loaded under it.
pub struct BrokerSession {
    access_token: String,
    catalog: Arc<InstrumentCatalog>,
}

impl std::fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSession")
            .field("access_token", &"<redacted>")
            .field("instruments", &self.catalog.len())
            .finish()
    }
}

impl BrokerSession {
    pub fn new(access_token: String, catalog: InstrumentCatalog) -> Self {
        Self {
            access_token,
            catalog: Arc::new(catalog),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn catalog(&self) -> &Arc<InstrumentCatalog> {
        &self.catalog
    }

    /// Resolves every reference up front.
    ///
    /// Any miss fails the whole request with `InvalidRequest` naming all unresolved
    /// references, so no partial batch is ever sent.
    pub fn resolve_all(&self, instruments: &[InstrumentRef]) -> Result<Vec<String>, GatewayError> {
        let mut keys = Vec::with_capacity(instruments.len());
        let mut missing = Vec::new();

        for instrument in instruments {
            match self.catalog.resolve_ref(instrument) {
                Ok(key) => keys.push(key.to_string()),
                Err(_) => missing.push(instrument.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(GatewayError::InvalidRequest(format!(
                "Unknown instruments: {}",
                missing.join(", ")
            )));
        }
        Ok(keys)
    }

    /// Resolves a single reference, failing with `InvalidRequest` on a miss.
    pub fn resolve_one(&self, instrument: &InstrumentRef) -> Result<String, GatewayError> {
        self.catalog
            .resolve_ref(instrument)
            .map(str::to_string)
            .map_err(|_| GatewayError::InvalidRequest(format!("Unknown instrument: {}", instrument)))
    }

    /// Re-keys provider quotes by exchange token.
    ///
    /// A quote without an instrument key, or with one `key_is_valid` rejects, means the
    /// payload is not what the broker documents and fails the call. A well-formed key
    /// missing from the catalog is dropped with a warning.
    pub fn translate_quotes(
        &self,
        broker: &str,
        quotes: impl IntoIterator<Item = ProviderQuote>,
        key_is_valid: impl Fn(&str) -> bool,
    ) -> Result<QuoteMap, GatewayError> {
        let mut translated = QuoteMap::new();

        for quote in quotes {
            let instrument_key = match quote.instrument_key.clone() {
                Some(key) if key_is_valid(&key) => key,
                Some(key) => {
                    return Err(GatewayError::upstream(
                        broker,
                        format!("Malformed instrument key in quote response: '{}'", key),
                    ))
                }
                None => {
                    return Err(GatewayError::upstream(
                        broker,
                        "Quote response entry without instrument key",
                    ))
                }
            };

            match self.catalog.reverse_resolve(&instrument_key) {
                Ok(symbol) => {
                    let quote = Quote::from_provider(instrument_key, symbol, quote);
                    translated.insert(quote.exchange_token.clone(), quote);
                }
                Err(_) => warn!(
                    "{}: dropping quote for {} (not in catalog)",
                    broker, instrument_key
                ),
            }
        }

        Ok(translated)
    }
}

/// Holder of an adapter's current session.
pub struct SessionSlot {
    broker: &'static str,
    current: RwLock<Option<Arc<BrokerSession>>>,
    init_lock: Mutex<()>,
}

impl SessionSlot {
    pub fn new(broker: &'static str) -> Self {
        Self {
            broker,
            current: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Current session, or `NotInitialized`.
    pub async fn current(&self) -> Result<Arc<BrokerSession>, GatewayError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| GatewayError::NotInitialized {
                broker: self.broker.to_string(),
            })
    }

    pub async fn is_ready(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Builds a new session with `load` and swaps it in.
    ///
    /// Initializations are serialized; a failed load leaves the previous session in
    /// place. The write lock is only held for the swap itself.
    pub async fn initialize_with<F, Fut>(&self, load: F) -> Result<(), GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BrokerSession, GatewayError>>,
    {
        let _guard = self.init_lock.lock().await;

        let session = load().await?;
        let instruments = session.catalog.len();
        *self.current.write().await = Some(Arc::new(session));

        info!("{} session ready ({} instruments)", self.broker, instruments);
        Ok(())
    }
}
