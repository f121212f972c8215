//! HTTP transport for the CNVS site
//!
//! The rest of the crate only sees the [`PageFetcher`] trait. [`CnvsClient`]
//! is the production implementation: a reqwest client with a shared cookie
//! store and browser-like headers. Non-success statuses are returned to the
//! caller untouched so the login exchange can inspect them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use url::Url;

use crate::error::{CnvsError, Result};

/// Base URL of the CNVS site
pub const CNVS_BASE_URL: &str = "https://cnvsweb.stream";

/// Default User-Agent mimicking a modern browser
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Default Accept-Language header for Brazilian Portuguese content
const DEFAULT_ACCEPT_LANGUAGE: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";

/// HTTP method of a [`FetchRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A single page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    /// Absolute address
    pub url: String,
    /// Query-string pairs appended to `url`
    pub query: Vec<(String, String)>,
    /// Form body pairs (sent url-encoded)
    pub form: Vec<(String, String)>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// GET request for an absolute address.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// POST request for an absolute address.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    /// Append a query-string pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a form field.
    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Append a request header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// A fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status of the final response
    pub status: u16,
    /// Address of the final response, after redirects
    pub url: String,
    /// Response body as text
    pub body: String,
}

impl FetchedPage {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to fetch a page through a shared cookie store
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Perform one request. Transport failures are errors; HTTP error
    /// statuses are not.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedPage>;

    /// Site origin that relative addresses resolve against.
    fn base_url(&self) -> &Url;
}

/// Configuration for the CNVS HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site origin (default: https://cnvsweb.stream)
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: CNVS_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the CNVS site
///
/// This client automatically:
/// - Keeps cookies across requests (login state lives in them)
/// - Follows redirects
/// - Sets the headers the site expects from a browser
pub struct CnvsClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Site origin
    base_url: Url,
}

impl CnvsClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// - `CnvsError::InvalidUrl` - `base_url` is not an absolute address
    /// - `CnvsError::HttpError` - the HTTP client cannot be created
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CnvsError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));
        let referer = format!("{}/", base_url.as_str().trim_end_matches('/'));
        if let Ok(value) = HeaderValue::from_str(&referer) {
            headers.insert(REFERER, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PageFetcher for CnvsClient {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedPage> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;

        tracing::trace!(%url, status, bytes = body.len(), "fetched page");

        Ok(FetchedPage { status, url, body })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}
