//! HTTP client settings and construction.
//!
//! The directory clients share one `reqwest::Client` per instance. Authentication and the
//! user agent are installed as default headers when the client is built, so individual
//! requests only add the headers that differ per call.

use crate::config::{ScimConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// User agent sent with every SCIM request.
pub const SCIM_USER_AGENT: &str =
    "so4t_scim_user_activation/1.0 (http://your-app-url.com; your-contact@email.com)";

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Enable response compression
    pub enable_compression: bool,
}

impl HttpClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
        }
    }

    /// Set request timeout. Other settings are plain fields.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the immutable header set shared by every request.
///
/// # Errors
///
/// Returns [`Error::ConfigError`] if the token cannot be used as a header value.
pub fn base_headers(config: &ScimConfig) -> Result<HeaderMap> {
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token.expose_secret()))
        .map_err(|_| Error::ConfigError("SCIM token contains invalid characters".to_string()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(USER_AGENT, HeaderValue::from_static(SCIM_USER_AGENT));
    Ok(headers)
}

/// Build the `reqwest` client for a SCIM configuration.
///
/// # Errors
///
/// Returns [`Error::ConfigError`] when the headers or the proxy are unusable.
pub fn build_http_client(config: &ScimConfig, http: &HttpClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .default_headers(base_headers(config)?)
        .timeout(http.timeout)
        .pool_idle_timeout(http.pool_idle_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .gzip(http.enable_compression);

    if let Some(proxy) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::https(proxy)
            .map_err(|e| Error::ConfigError(format!("Invalid proxy `{proxy}`: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {e}")))
}
