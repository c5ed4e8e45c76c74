//! Gateway endpoint lookup

use async_trait::async_trait;
use serde::Deserialize;

use super::{GatewayError, GatewayResult};

/// Finds the WebSocket URL to connect to
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self) -> GatewayResult<String>;
}

#[derive(Debug, Deserialize)]
struct GatewayBotResponse {
    url: String,
    #[serde(default)]
    shards: Option<u32>,
}

/// Asks the REST API (`GET /gateway/bot`)
pub struct RestEndpointResolver {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl RestEndpointResolver {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl EndpointResolver for RestEndpointResolver {
    async fn resolve(&self) -> GatewayResult<String> {
        let url = format!("{}/gateway/bot", self.api_url.trim_end_matches('/'));
        let response: GatewayBotResponse = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.url.is_empty() {
            return Err(GatewayError::InvalidEndpoint("empty url".to_string()));
        }
        tracing::debug!(url = %response.url, recommended_shards = ?response.shards, "Resolved gateway endpoint");
        Ok(response.url)
    }
}

/// A fixed endpoint, for tests and self-hosted gateways
#[derive(Debug, Clone)]
pub struct StaticEndpoint(pub String);

#[async_trait]
impl EndpointResolver for StaticEndpoint {
    async fn resolve(&self) -> GatewayResult<String> {
        Ok(self.0.clone())
    }
}

/// Append the protocol query to a resolved endpoint
pub(crate) fn connect_url(endpoint: &str, version: u8) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}encoding=json&v={version}")
}
