//! Error types for the broker gateway.
//!
//! [`GatewayError`] is the single error enum returned by every catalog, adapter and
//! lifecycle operation. Recoverable outcomes (an empty historical chunk, a quote whose
//! instrument key drifted out of the catalog) are not errors; they are logged and the
//! enclosing call continues.

use thiserror::Error;

/// Errors that can occur while resolving instruments, calling a broker or rotating
/// its credential.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No catalog row matched the lookup.
    /// Always surfaced to the caller; retrying won't help.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The request itself is invalid (unresolvable instrument, bad interval or date range).
    /// Raised before any network call is made.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The instrument feed could not be fetched or parsed during `initialize()`.
    #[error("Data unavailable from {broker}: {message}")]
    DataUnavailable {
        /// The broker whose feed failed
        broker: String,
        /// What went wrong
        message: String,
    },

    /// The broker answered with a non-success response.
    /// Aborts the enclosing multi-batch call.
    #[error("Upstream API error from {broker}{}: {message}", http_suffix(.status))]
    UpstreamApi {
        /// The broker that returned the error
        broker: String,
        /// HTTP status, when the failure came with one
        status: Option<u16>,
        /// The error message from the broker
        message: String,
    },

    /// The broker rate limited the request (HTTP 429).
    /// Treated as a stop, never retried inline.
    #[error("Rate limited: {broker}")]
    RateLimited {
        /// The broker that rate limited the request
        broker: String,
    },

    /// Obtaining or storing a fresh credential failed.
    #[error("Authentication failed for {broker}: {message}")]
    AuthFailure {
        /// The broker whose credential could not be rotated
        broker: String,
        /// Description of the failure
        message: String,
    },

    /// The adapter has no usable credential and catalog yet.
    #[error("Broker not initialized: {broker}")]
    NotInitialized {
        /// The broker that is not ready
        broker: String,
    },

    /// No constructor is registered for the requested broker type.
    #[error("Broker type '{0}' is not registered")]
    UnknownBroker(String),

    /// The request to the broker timed out.
    #[error("Timeout: {broker}")]
    Timeout {
        /// The broker that timed out
        broker: String,
    },

    /// An adapter or rotator call panicked. The panic is contained to that broker.
    #[error("Internal error in {broker}: {message}")]
    Internal {
        /// The broker whose call panicked
        broker: String,
        /// The panic payload, when it was a string
        message: String,
    },

    /// A network error occurred while communicating with a broker.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl GatewayError {
    /// Builds an [`GatewayError::UpstreamApi`] without an HTTP status.
    pub fn upstream(broker: &str, message: impl Into<String>) -> Self {
        Self::UpstreamApi {
            broker: broker.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// Builds a [`GatewayError::DataUnavailable`].
    pub fn data_unavailable(broker: &str, message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            broker: broker.to_string(),
            message: message.into(),
        }
    }

    /// Builds an [`GatewayError::AuthFailure`].
    pub fn auth(broker: &str, message: impl Into<String>) -> Self {
        Self::AuthFailure {
            broker: broker.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than the broker.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownInstrument(_) | Self::InvalidRequest(_))
    }
}
