//! HTTP client for the Media Monarchy endpoints
//!
//! Three plain GET endpoints are involved, all relative to the stream server:
//!
//! - `/{stream}_title`: plain-text now-playing title
//! - `/{stream}_metadata`: JSON document describing the file being played
//! - `/onair_stream`: current mount point of the live broadcast

use crate::catalog::LivePathSource;
use crate::channels::StreamKind;
use crate::config::ApiConfig;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::metadata::{MetadataSource, StreamMetadata};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Media Monarchy HTTP client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct MonarchyClient {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl MonarchyClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the stream server base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL of `path` on the stream server
    pub fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url_for(path)?;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    /// Fetch the plain-text title of `stream`
    pub async fn title(&self, stream: StreamKind) -> Result<String> {
        let body = self
            .get(&format!("/{}_title", stream.slug()))
            .await?
            .text()
            .await?;
        Ok(body)
    }

    /// Fetch the metadata document of `stream`
    pub async fn metadata(&self, stream: StreamKind) -> Result<StreamMetadata> {
        let body = self
            .get(&format!("/{}_metadata", stream.slug()))
            .await?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch the current mount point of the live broadcast
    pub async fn live_path(&self) -> Result<String> {
        let body = self.get(LIVE_PATH_ENDPOINT).await?.text().await?;
        normalize_live_path(&body)
    }
}

/// Cleans up the body of the live path endpoint.
///
/// Absolute URLs are kept as they are, relative paths get a leading slash.
pub(crate) fn normalize_live_path(body: &str) -> Result<String> {
    let path = body.trim();
    if path.is_empty() {
        return Err(Error::LivePath("empty response".into()));
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{path}"))
    }
}

#[async_trait]
impl LivePathSource for MonarchyClient {
    async fn current_path(&self) -> Result<String> {
        self.live_path().await
    }
}

#[async_trait]
impl MetadataSource for MonarchyClient {
    async fn fetch_title(&self, stream: StreamKind) -> Result<String> {
        self.title(stream).await
    }

    async fn fetch_metadata(&self, stream: StreamKind) -> Result<StreamMetadata> {
        self.metadata(stream).await
    }
}

/// Builder for configuring a MonarchyClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    request_timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the `api` section of the configuration
    pub fn from_config(api: &ApiConfig) -> Self {
        Self::default()
            .base_url(api.base_url.clone())
            .timeout(api.request_timeout())
            .user_agent(api.user_agent.clone())
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the stream server base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<MonarchyClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.request_timeout)
                .build()?,
        };

        Ok(MonarchyClient {
            client,
            base_url: Url::parse(&self.base_url)?,
            request_timeout: self.request_timeout,
        })
    }
}
