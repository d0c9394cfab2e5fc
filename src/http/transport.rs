//! Network transports: one round trip per call, no retry.
//!
//! The traits are the seam between the client facades and `reqwest`;
//! tests substitute mocks to count and script round trips.

use async_trait::async_trait;
use log::debug;
use reqwest::header::RETRY_AFTER;
use serde_json::Value;

use super::classify::classify_transport_error;
use crate::config::ClientConfig;
use crate::error::{Result, SerpshotError};

/// An HTTP answer before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if any.
    pub retry_after: Option<String>,
    pub body: String,
}

/// Async single-shot transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// POSTs `body` as JSON to `path` (relative to the base URL).
    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse>;
}

/// Blocking single-shot transport.
#[cfg_attr(test, mockall::automock)]
pub trait BlockingTransport: Send + Sync {
    /// POSTs `body` as JSON to `path` (relative to the base URL).
    fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse>;
}

/// [`AsyncTransport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Builds a client carrying the auth headers, User-Agent and timeout
    /// from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(config.api_key().headers()?)
            .user_agent(crate::user_agent())
            .timeout(config.timeout())
            .build()
            .map_err(|e| SerpshotError::network("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }
}

#[async_trait]
impl AsyncTransport for ReqwestTransport {
    #[tracing::instrument(skip(self, body))]
    async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}...", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(classify_transport_error)?;

        debug!("POST {} -> {} ({} bytes)", url, status, body.len());

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// [`BlockingTransport`] backed by `reqwest::blocking::Client`.
///
/// Must not be created or used from inside an async runtime.
#[derive(Debug, Clone)]
pub struct BlockingReqwestTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BlockingReqwestTransport {
    /// Builds a blocking client carrying the auth headers, User-Agent and timeout
    /// from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(config.api_key().headers()?)
            .user_agent(crate::user_agent())
            .timeout(config.timeout())
            .build()
            .map_err(|e| SerpshotError::network("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }
}

impl BlockingTransport for BlockingReqwestTransport {
    #[tracing::instrument(skip(self, body))]
    fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}...", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().map_err(classify_transport_error)?;

        debug!("POST {} -> {} ({} bytes)", url, status, body.len());

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}
