//! Client configuration.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The poll budget lives here rather than on each
//! request because the service's processing characteristics are a property
//! of the deployment, not of a single file.
//!
//! Transport knobs (`request_timeout_secs`, `accept_invalid_certs`,
//! `user_agent`) only configure the default reqwest backend; a custom
//! [`crate::backend::HttpTransport`] is free to ignore them.

use crate::error::ConvertError;
use std::fmt;
use std::time::Duration;

/// Public Convertorio API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.convertorio.com";

/// Default number of status checks before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default wait between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration for a [`crate::ConvertorioClient`].
///
/// # Example
/// ```rust
/// use convertorio::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder("sk_live_123")
///     .max_attempts(30)
///     .poll_interval(Duration::from_millis(500))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 30);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Static API key, sent as `Authorization: Bearer <key>`.
    pub api_key: String,

    /// API base URL, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Maximum number of status checks per conversion. Default: 60.
    ///
    /// Together with `poll_interval` this is the only timeout the workflow
    /// applies: a job still running after `max_attempts` checks fails with
    /// [`ConvertError::ConversionTimeout`].
    pub max_attempts: u32,

    /// Wait between status checks. The first check is never delayed. Default: 2 s.
    pub poll_interval: Duration,

    /// Per-request timeout for the default HTTP backend, in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Skip TLS certificate verification in the default HTTP backend. Default: false.
    ///
    /// Only meant for staging deployments behind self-signed certificates.
    pub accept_invalid_certs: bool,

    /// `User-Agent` header sent by the default HTTP backend.
    pub user_agent: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder(api_key: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self {
                api_key: api_key.into(),
                base_url: DEFAULT_BASE_URL.to_string(),
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                poll_interval: DEFAULT_POLL_INTERVAL,
                request_timeout_secs: 60,
                accept_invalid_certs: false,
                user_agent: format!("convertorio-rust/{}", env!("CARGO_PKG_VERSION")),
            },
        }
    }

    /// Build a config from `CONVERTORIO_API_KEY` and, if set, `CONVERTORIO_BASE_URL`.
    pub fn from_env() -> Result<Self, ConvertError> {
        let api_key = std::env::var("CONVERTORIO_API_KEY").map_err(|_| {
            ConvertError::InvalidConfig(
                "CONVERTORIO_API_KEY is not set. Get a key at https://convertorio.com/account"
                    .into(),
            )
        })?;

        let mut builder = Self::builder(api_key);
        if let Ok(url) = std::env::var("CONVERTORIO_BASE_URL") {
            if !url.is_empty() {
                builder = builder.base_url(url);
            }
        }
        builder.build()
    }

    /// Join an API path (starting with `/`) onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn accept_invalid_certs(mut self, v: bool) -> Self {
        self.config.accept_invalid_certs = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ConvertError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "API key is required. Get yours at https://convertorio.com/account".into(),
            ));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ConvertError::InvalidConfig(format!(
                "Base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.max_attempts == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::builder("key").build().unwrap();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.max_attempts, 60);
        assert_eq!(c.poll_interval, Duration::from_secs(2));
        assert!(!c.accept_invalid_certs);
        assert!(c.user_agent.starts_with("convertorio-rust/"));
    }

    #[test]
    fn empty_key_rejected() {
        let err = ClientConfig::builder("  ").build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = ClientConfig::builder("key").max_attempts(0).build().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = ClientConfig::builder("key")
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.endpoint("/v1/account"), "http://localhost:8080/v1/account");
    }

    #[test]
    fn non_http_base_url_rejected() {
        let err = ClientConfig::builder("key")
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://example.com"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = ClientConfig::builder("sk_secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk_secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
