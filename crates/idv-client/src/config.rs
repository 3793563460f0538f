//! Gateway configuration.
//!
//! Defaults target a locally running gateway stub. Override via
//! environment variables or explicit construction.

use url::Url;

/// Default base URL of the verification API.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5001";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default transport retries for the status query.
pub const DEFAULT_STATUS_RETRIES: u32 = 3;

/// Upper bound on status query retries.
pub const MAX_STATUS_RETRIES: u32 = 5;

/// Configuration for [`crate::HttpVerificationGateway`].
///
/// Holds no credential. Tokens are supplied per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Transport-error retries for the status query. Submission is never
    /// retried.
    pub status_retries: u32,
}

impl GatewayConfig {
    /// Configuration with the given base URL and default timeouts.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base("base_url", base_url)?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            status_retries: DEFAULT_STATUS_RETRIES,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `IDV_API_BASE` (default: `http://127.0.0.1:5001`)
    /// - `IDV_TIMEOUT_SECS` (default: 30)
    /// - `IDV_STATUS_RETRIES` (default: 3, at most 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_url("IDV_API_BASE", DEFAULT_API_BASE)?,
            timeout_secs: env_number("IDV_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            status_retries: bounded_retries(
                "IDV_STATUS_RETRIES",
                env_number("IDV_STATUS_RETRIES", DEFAULT_STATUS_RETRIES)?,
            )?,
        })
    }

    /// Configuration pointing at a local server on `port` (for testing).
    ///
    /// Short timeout, no status retries.
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base("localhost", &format!("http://127.0.0.1:{port}"))?,
            timeout_secs: 5,
            status_retries: 0,
        })
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the status query retries, clamped to [`MAX_STATUS_RETRIES`].
    pub fn with_status_retries(mut self, retries: u32) -> Self {
        self.status_retries = retries.min(MAX_STATUS_RETRIES);
        self
    }

    /// Absolute URL for an endpoint path relative to the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_base(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(
            name.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_base(var, &raw)
}

fn env_number<N: std::str::FromStr>(var: &str, default: N) -> Result<N, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn bounded_retries(var: &str, retries: u32) -> Result<u32, ConfigError> {
    if retries > MAX_STATUS_RETRIES {
        return Err(ConfigError::OutOfRange {
            var: var.to_string(),
            value: u64::from(retries),
            max: u64::from(MAX_STATUS_RETRIES),
        });
    }
    Ok(retries)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
    #[error("{var} is {value}, above the maximum of {max}")]
    OutOfRange { var: String, value: u64, max: u64 },
}
