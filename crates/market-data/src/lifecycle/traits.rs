//! Credential collaborators.
//!
//! Producing a fresh credential (often an interactive or browser-driven login) and
//! persisting it are outside this crate. The lifecycle manager and the adapters only
//! see these two traits and receive implementations at construction time.

use async_trait::async_trait;

use crate::errors::GatewayError;

/// Minimum length of a plausible access token.
const MIN_TOKEN_LEN: usize = 10;

/// Obtains a fresh access token from the broker's login flow.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// May be slow. Fails with `AuthFailure`.
    async fn fetch_access_token(&self) -> Result<String, GatewayError>;
}

/// Durable storage of the current access token of one broker.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_current_token(&self) -> Result<Option<String>, GatewayError>;

    /// Persists `token`. Returns `false` when the store refused it.
    async fn store_token(&self, token: &str) -> Result<bool, GatewayError>;

    /// Cheap plausibility check, not a call to the broker.
    fn is_token_valid(&self, token: &str) -> bool {
        token.trim().len() > MIN_TOKEN_LEN
    }
}
