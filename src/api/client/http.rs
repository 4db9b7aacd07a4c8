//! HTTP client implementation
//!
//! Talks to a running `outliner serve` instance.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Error as ReqwestError, Response};
use serde::de::DeserializeOwned;

use super::Client;
use crate::api::server::ApiResponse;
use crate::config::OutlineConfig;
use crate::events::EventRecord;
use crate::models::{ItemId, ItemRecord};
use crate::operation::{Dispatched, Operation};
use crate::outline::OutlineError;

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error(transparent)]
    Outline(#[from] OutlineError),

    #[error("Missing data in response")]
    MissingData,
}

/// API client for an outline server
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    // Error statuses still carry an ApiResponse body; prefer its message when present
    async fn unwrap_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let api_response = match response.json::<ApiResponse<T>>().await {
            Ok(api_response) => api_response,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api(format!("HTTP error: {}", status)))
            }
            Err(e) => return Err(ClientError::Http(e)),
        };

        if api_response.success {
            api_response.data.ok_or(ClientError::MissingData)
        } else {
            Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| format!("HTTP error: {}", status)),
            ))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http_client.get(self.url(path)).send().await?;
        Self::unwrap_response(response).await
    }
}

#[async_trait::async_trait]
impl Client for HttpClient {
    async fn outline(&self) -> Result<Vec<ItemRecord>, ClientError> {
        self.get("/api/outline").await
    }

    async fn item(&self, id: &ItemId) -> Result<ItemRecord, ClientError> {
        self.get(&format!("/api/items/{}", id)).await
    }

    async fn config(&self) -> Result<OutlineConfig, ClientError> {
        self.get("/api/config").await
    }

    async fn dispatch(&self, op: Operation) -> Result<Dispatched, ClientError> {
        let response = self
            .http_client
            .post(self.url("/api/ops"))
            .json(&op)
            .send()
            .await?;
        Self::unwrap_response(response).await
    }

    async fn events_since(&self, since: u64) -> Result<Vec<EventRecord>, ClientError> {
        self.get(&format!("/api/events?since={}", since)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = HttpClient::with_config(ClientConfig {
            base_url: "http://localhost:4000/".to_string(),
        });
        assert_eq!(client.url("/api/outline"), "http://localhost:4000/api/outline");
    }
}
