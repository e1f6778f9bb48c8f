//! Configuration structures for SCIM directory clients.
//!
//! This module holds the caller-supplied connection settings (base URL, bearer token,
//! outbound proxy, timeout) and derives the SCIM users endpoint from them. The hosted and
//! self-hosted products expose SCIM under different paths, see [`Deployment`].

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Host fragment identifying the multi-tenant hosted product.
pub const HOSTED_DOMAIN: &str = "stackoverflowteams.com";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Deployment tier of the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Multi-tenant hosted product (Basic and Business tiers).
    Hosted,
    /// Self-hosted or enterprise product.
    SelfHosted,
}

impl Deployment {
    /// Detect the deployment tier from a base URL.
    #[must_use]
    pub fn detect(base_url: &str) -> Self {
        if base_url.contains(HOSTED_DOMAIN) {
            Self::Hosted
        } else {
            Self::SelfHosted
        }
    }

    /// Path of the SCIM users collection relative to the base URL.
    #[must_use]
    pub const fn users_path(self) -> &'static str {
        match self {
            Self::Hosted => "auth/scim/v2/users",
            Self::SelfHosted => "api/scim/v2/users",
        }
    }
}

/// Connection settings for a SCIM directory.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScimConfig {
    /// Base URL of the platform instance (e.g. `https://acme.stackenterprise.co`)
    #[validate(url)]
    pub base_url: String,

    /// SCIM bearer token
    #[serde(deserialize_with = "deserialize_token")]
    pub token: SecretString,

    /// Optional outbound HTTPS proxy
    #[validate(url)]
    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl ScimConfig {
    /// Create a configuration from the base URL and bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the token is empty.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            base_url: base_url.into(),
            token: SecretString::from(token.into()),
            proxy: None,
            request_timeout_secs: default_request_timeout_secs(),
        };

        config.check()?;
        Ok(config)
    }

    /// Set the outbound HTTPS proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Validate every field, including ones set through the builder methods.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for malformed fields and [`Error::ConfigError`]
    /// for an empty token.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;

        if self.token.expose_secret().trim().is_empty() {
            return Err(Error::ConfigError("SCIM token must not be empty".to_string()));
        }

        Ok(())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Deployment tier derived from the base URL.
    #[must_use]
    pub fn deployment(&self) -> Deployment {
        Deployment::detect(&self.base_url)
    }

    /// Compute the SCIM users endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the resulting URL cannot be parsed.
    pub fn users_endpoint(&self) -> Result<Url, Error> {
        let base = self.base_url.trim_end_matches('/');
        let endpoint = format!("{base}/{}", self.deployment().users_path());
        Url::parse(&endpoint).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hosted_product() {
        assert_eq!(
            Deployment::detect("https://stackoverflowteams.com/c/acme"),
            Deployment::Hosted
        );
        assert_eq!(
            Deployment::detect("https://acme.stackenterprise.co"),
            Deployment::SelfHosted
        );
    }

    #[test]
    fn hosted_endpoint_uses_auth_path() {
        let config = ScimConfig::new("https://stackoverflowteams.com/c/acme", "token").unwrap();
        assert_eq!(
            config.users_endpoint().unwrap().as_str(),
            "https://stackoverflowteams.com/c/acme/auth/scim/v2/users"
        );
    }

    #[test]
    fn self_hosted_endpoint_uses_api_path() {
        let config = ScimConfig::new("https://acme.stackenterprise.co/", "token").unwrap();
        assert_eq!(config.deployment(), Deployment::SelfHosted);
        assert_eq!(
            config.users_endpoint().unwrap().as_str(),
            "https://acme.stackenterprise.co/api/scim/v2/users"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = ScimConfig::new("not a url", "token").unwrap_err();
        assert!(matches!(err, Error::ValidationError(msg) if msg.contains("base_url")));
    }

    #[test]
    fn rejects_empty_token() {
        let err = ScimConfig::new("https://acme.stackenterprise.co", "  ").unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("token")));
    }

    #[test]
    fn builder_overrides() {
        let config = ScimConfig::new("https://acme.stackenterprise.co", "token")
            .unwrap()
            .with_proxy("http://proxy.internal:3128")
            .with_timeout(5);

        assert!(config.check().is_ok());
        assert_eq!(config.proxy.as_deref(), Some("http://proxy.internal:3128"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn check_rejects_bad_overrides() {
        let config = ScimConfig::new("https://acme.stackenterprise.co", "token")
            .unwrap()
            .with_timeout(0);
        assert!(config.check().is_err());

        let config = ScimConfig::new("https://acme.stackenterprise.co", "token")
            .unwrap()
            .with_proxy("not a proxy");
        assert!(config.check().is_err());
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let config = ScimConfig::new("https://acme.stackenterprise.co", "s3cr3t").unwrap();
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ScimConfig = serde_json::from_str(
            r#"{"base_url": "https://acme.stackenterprise.co", "token": "abc"}"#,
        )
        .unwrap();
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.proxy.is_none());
        assert_eq!(config.token.expose_secret(), "abc");
    }
}
