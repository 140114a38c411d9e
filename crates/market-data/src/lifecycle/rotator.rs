//! Credential rotation.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use super::traits::{Authenticator, TokenStore};
use crate::errors::GatewayError;

/// Replaces a broker's stored credential with a fresh one.
#[async_trait]
pub trait Rotator: Send + Sync {
    async fn rotate(&self) -> Result<(), GatewayError>;
}

/// Default rotator: log in through the [`Authenticator`], then persist the token in
/// the [`TokenStore`] the adapter reads on `initialize()`.
pub struct TokenRotator {
    broker_type: &'static str,
    authenticator: Arc<dyn Authenticator>,
    token_store: Arc<dyn TokenStore>,
}

impl TokenRotator {
    pub fn new(
        broker_type: &'static str,
        authenticator: Arc<dyn Authenticator>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            broker_type,
            authenticator,
            token_store,
        }
    }
}

#[async_trait]
impl Rotator for TokenRotator {
    async fn rotate(&self) -> Result<(), GatewayError> {
        let token = self.authenticator.fetch_access_token().await?;

        if !self.token_store.is_token_valid(&token) {
            return Err(GatewayError::auth(
                self.broker_type,
                "Authenticator returned an implausible token",
            ));
        }
        if !self.token_store.store_token(&token).await? {
            return Err(GatewayError::auth(
                self.broker_type,
                "Token store rejected the new token",
            ));
        }

        info!("Stored fresh access token for {}", self.broker_type);
        Ok(())
    }
}
