//! HTTP transport seam.
//!
//! The lookup client only needs "GET this URL, give me status and body".
//! Keeping that behind a trait lets tests script responses without a
//! network.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use switchboard_core::LookupConfig;
use thiserror::Error;

/// Raw response from the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportFailure(pub String);

#[async_trait]
pub trait LookupTransport: Send + Sync {
    /// Issue a GET request for `url`.
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportFailure>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &LookupConfig) -> Result<Self, TransportFailure> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportFailure(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one shared with the platform layer.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportFailure> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportFailure(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure(format!("Failed to read response body: {}", e)))?;

        Ok(TransportResponse::new(status, body.to_vec()))
    }
}
