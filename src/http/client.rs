//! Insightly API client
//!
//! Every request goes through the shared [`ConcurrencyGate`] and then the
//! shared [`RateLimiter`], in that order. Failures are not retried: a
//! non-2xx status surfaces as [`Error::HttpStatus`] and a 429 in particular
//! means the rate ceiling is tuned above what the live API accepts.

use super::gate::ConcurrencyGate;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Row};
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Response header carrying the total row count of a paginated listing
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// API root all endpoint paths are resolved against
    pub base_url: String,
    /// API key (Basic-auth username)
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Rate limiter configuration
    pub rate_limit: RateLimiterConfig,
    /// Concurrency gate capacity
    pub max_concurrency: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            user_agent: format!("tap-insightly/{}", env!("CARGO_PKG_VERSION")),
            rate_limit: RateLimiterConfig::default(),
            max_concurrency: 4,
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

impl From<&TapConfig> for HttpClientConfig {
    fn from(config: &TapConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            rate_limit: RateLimiterConfig::new(config.requests_per_second),
            max_concurrency: config.max_concurrency,
        }
    }
}

/// Builder for API client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    /// Set the concurrency gate capacity
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// A decoded successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Rows of the JSON array body
    pub rows: Vec<Row>,
    /// Value of the `x-total-count` header, when present and numeric
    pub total_count: Option<u64>,
}

/// API client sharing one gate and one rate limiter across all callers
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    gate: ConcurrencyGate,
    limiter: RateLimiter,
}

impl ApiClient {
    /// Create a client with its own gate and rate limiter
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let gate = ConcurrencyGate::new(config.max_concurrency);
        let limiter = RateLimiter::new(&config.rate_limit);
        Self::with_limits(config, gate, limiter)
    }

    /// Create a client using externally constructed gate and rate limiter
    pub fn with_limits(
        config: &HttpClientConfig,
        gate: ConcurrencyGate,
        limiter: RateLimiter,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&basic_auth_header(&config.api_key))
            .map_err(|e| Error::invalid_value("api_key", e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url)?,
            gate,
            limiter,
        })
    }

    /// The shared concurrency gate
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// The shared rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Issue one GET against `path` and decode the JSON array body.
    ///
    /// `count_total=true` is always sent first, followed by `query` in order.
    pub async fn get(
        &self,
        source: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse> {
        let url = self.base_url.join(path)?;

        let permit = self.gate.acquire().await?;
        self.limiter.acquire().await;

        let mut params: Vec<(&str, &str)> = Vec::with_capacity(query.len() + 1);
        params.push(("count_total", "true"));
        params.extend(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        debug!(source, %url, ?params, "GET");
        let response = self.client.get(url.clone()).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            drop(permit);
            if status.as_u16() == 429 {
                warn!(
                    source,
                    "Rate limited (429) by the API; requests_per_second or max_concurrency is set too high"
                );
            }
            return Err(Error::http_status(status.as_u16(), body));
        }

        let total_count = parse_total_count(response.headers());
        let body = response.text().await?;
        drop(permit);

        let rows = decode_rows(&body)
            .map_err(|e| Error::decode(format!("{source}: response from {url}: {e}")))?;
        debug!(source, rows = rows.len(), total_count, "Response decoded");

        Ok(ApiResponse { rows, total_count })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("gate", &self.gate)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// `Basic <base64(api_key:)>`
fn basic_auth_header(api_key: &str) -> String {
    let credentials = base64::engine::general_purpose::STANDARD.encode(format!("{api_key}:"));
    format!("Basic {credentials}")
}

/// Ensure the base URL ends with a slash so relative joins append to it
fn normalize_base_url(base: &str) -> Result<Url> {
    if base.ends_with('/') {
        Ok(Url::parse(base)?)
    } else {
        Ok(Url::parse(&format!("{base}/"))?)
    }
}

fn parse_total_count(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Decode a body that must be a JSON array of objects
fn decode_rows(body: &str) -> std::result::Result<Vec<Row>, String> {
    let value: JsonValue = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let JsonValue::Array(items) = value else {
        return Err("expected a JSON array".to_string());
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            JsonValue::Object(row) => Ok(row),
            other => Err(format!("element {i} is not an object: {other}")),
        })
        .collect()
}
