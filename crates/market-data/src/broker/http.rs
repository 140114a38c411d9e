//! HTTP plumbing shared by the broker adapters.

use std::time::Duration;

use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::wire::ApiEnvelope;
use crate::errors::GatewayError;

/// Header name/value pairs attached to a request.
pub type Headers = Vec<(&'static str, String)>;

/// Thin wrapper over `reqwest` that maps transport and envelope failures to
/// [`GatewayError`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    broker: &'static str,
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(broker: &'static str, base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            broker,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}{path}` and unwrap the `{status, data}` envelope.
    ///
    /// Returns `Ok(None)` when the envelope reports success without a payload.
    pub async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        headers: &Headers,
    ) -> Result<Option<T>, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} request: {} with {} params", self.broker, path, query.len());

        let request = with_headers(self.client.get(&url).query(query), headers);
        let body = self.send(request).await?;

        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body).map_err(|e| {
            GatewayError::upstream(self.broker, format!("Failed to parse response: {}", e))
        })?;

        if !envelope.is_success() {
            return Err(GatewayError::upstream(self.broker, envelope.error_message()));
        }
        Ok(envelope.data)
    }

    /// GET an absolute URL and return the raw body (instrument feeds).
    pub async fn download(&self, url: &str, headers: &Headers) -> Result<Vec<u8>, GatewayError> {
        debug!("{} download: {}", self.broker, url);
        let request = with_headers(self.client.get(url), headers);
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, GatewayError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited {
                broker: self.broker.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .map(|envelope| envelope.error_message())
                .unwrap_or_else(|_| truncate(&body, 200));

            return Err(GatewayError::UpstreamApi {
                broker: self.broker.to_string(),
                status: Some(status.as_u16()),
                message,
            });
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout {
                broker: self.broker.to_string(),
            }
        } else {
            GatewayError::Network(error)
        }
    }
}

fn with_headers(mut request: RequestBuilder, headers: &Headers) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, value);
    }
    request
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    }
}
