//! HTTP transport shared by providers and notification channels.
//!
//! Every provider and channel receives its own `Transport` at construction
//! time, so tests can substitute a fake and no client is global.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

use crate::types::ApiError;

/// Default request timeout when the config does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("matchday/", env!("CARGO_PKG_VERSION"));

/// Minimal request surface needed by providers and channels.
///
/// `path` is appended verbatim to the transport's base URL. Non-2xx
/// responses are failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ApiError>;

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<Vec<u8>, ApiError>;
}

/// reqwest-backed transport bound to one base URL.
pub struct HttpClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            headers: HeaderMap::new(),
        })
    }

    /// Build a client whose base URL embeds a secret (webhooks, bot tokens).
    pub fn with_secret_url(url: &SecretString, timeout: Duration) -> Result<Self> {
        Self::with_timeout(url.expose_secret().clone(), timeout)
    }

    /// Attach a header sent with every request. The value is marked
    /// sensitive so it is masked in reqwest's debug output.
    pub fn with_header(mut self, name: &'static str, value: &SecretString) -> Result<Self> {
        let mut value = HeaderValue::from_str(value.expose_secret())
            .with_context(|| format!("Invalid value for header {name}"))?;
        value.set_sensitive(true);
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(resp: reqwest::Response) -> Result<Vec<u8>, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::status(status.as_u16(), &body));
        }
        let bytes = resp.bytes().await.map_err(ApiError::transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        debug!(path = %path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(ApiError::transport)?;
        Self::read(resp).await
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<Vec<u8>, ApiError> {
        debug!(path = %path, "POST");
        let resp = self
            .http
            .post(self.url(path))
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(ApiError::transport)?;
        Self::read(resp).await
    }
}
