//! HTTP fetch pipeline towards the origin.
//!
//! ### Forwarding
//! - Method, headers and body of the intercepted request are forwarded.
//! - Hop-by-hop headers are dropped in both directions.
//! - `accept-encoding` is left to reqwest so bodies arrive decoded.
//!
//! ### Outcome
//! - Any status code is a completed fetch; only transport failures are errors.
//! - Redirects are not followed: a 3xx reaches the caller as-is, with its
//!   `location` and `set-cookie` headers, and is never cached.
//! - Max body bytes: 10MB, timeout: 30s (both configurable).

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

use cachefront_core::{AppConfig, Error, RequestDescriptor, ResponseSnapshot};

/// Headers scoped to one connection; never forwarded and never stored.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Request headers the client sets itself.
const CLIENT_MANAGED: &[&str] = &["host", "accept-encoding"];

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string used when the request carries none (default: "cachefront/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Transport timeout (default: 30s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "cachefront/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(30_000),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes, fully read
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Capture this response as an immutable snapshot.
    ///
    /// Header values that are not valid UTF-8 are dropped.
    pub fn into_snapshot(self) -> ResponseSnapshot {
        let headers = self
            .headers
            .iter()
            .filter(|(name, _)| !HOP_BY_HOP.contains(&name.as_str()))
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        ResponseSnapshot::new(self.status.as_u16(), headers, self.bytes)
    }
}

/// Performs a network exchange for a request.
///
/// The proxy and the revalidation engine only depend on this trait, so the
/// transport can be replaced (or simulated in tests).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    /// Send the request to the origin and read the whole body.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url().clone();

        let mut builder = self
            .http
            .request(request.method().clone(), url.clone())
            .headers(forwarded_headers(request.headers()));
        if !request.body().is_empty() {
            builder = builder.body(request.body().clone());
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(transport_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            method = %request.method(),
            status = status.as_u16(),
            bytes = bytes.len(),
            "fetched {} in {}ms",
            url,
            fetch_ms
        );

        Ok(FetchResponse { url, status, content_type, bytes, headers, fetch_ms })
    }
}

/// Copy the headers that may travel to the origin.
fn forwarded_headers(headers: &header::HeaderMap) -> header::HeaderMap {
    let mut forwarded = header::HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name_str = name.as_str();
        if HOP_BY_HOP.contains(&name_str) || CLIENT_MANAGED.contains(&name_str) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}
