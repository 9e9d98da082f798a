//! Run configuration

use conformance_domain::RequestSpec;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ApplicationError, ApplicationResult};

/// Default gateway under test.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8080";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of chains run at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Settings for one conformance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Base URL for path-style requests.
    pub gateway_url: Url,
    /// Base URL for subdomain-style requests, when the gateway supports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain_url: Option<Url>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of chains executing concurrently.
    pub max_concurrency: usize,
}

impl RunConfig {
    /// Creates a configuration for a gateway with default limits.
    #[must_use]
    pub const fn new(gateway_url: Url) -> Self {
        Self {
            gateway_url,
            subdomain_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Parses the gateway URL and applies default limits.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Config`] if the URL is invalid.
    pub fn from_gateway(gateway_url: &str) -> ApplicationResult<Self> {
        Ok(Self::new(parse_url("gateway URL", gateway_url)?))
    }

    /// Sets the subdomain gateway URL.
    #[must_use]
    pub fn with_subdomain_url(mut self, url: Url) -> Self {
        self.subdomain_url = Some(url);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Checks the limits.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Config`] for a zero timeout or concurrency,
    /// or a base URL that cannot carry paths.
    pub fn validate(&self) -> ApplicationResult<()> {
        if self.timeout_ms == 0 {
            return Err(ApplicationError::Config("timeout must be positive".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(ApplicationError::Config(
                "max concurrency must be positive".to_string(),
            ));
        }
        for url in std::iter::once(&self.gateway_url).chain(self.subdomain_url.as_ref()) {
            if url.cannot_be_a_base() {
                return Err(ApplicationError::Config(format!("{url} cannot be a base URL")));
            }
        }
        Ok(())
    }

    /// The base URL a request resolves against.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Config`] for a subdomain request when no
    /// subdomain gateway is configured.
    pub fn base_url_for(&self, request: &RequestSpec) -> ApplicationResult<&Url> {
        if !request.targets_subdomain() {
            return Ok(&self.gateway_url);
        }
        self.subdomain_url.as_ref().ok_or_else(|| {
            ApplicationError::Config(
                "request targets a subdomain but no subdomain gateway is configured".to_string(),
            )
        })
    }
}

/// Parses a URL setting.
///
/// # Errors
///
/// Returns [`ApplicationError::Config`] naming the setting.
pub fn parse_url(setting: &str, value: &str) -> ApplicationResult<Url> {
    Url::parse(value).map_err(|e| ApplicationError::Config(format!("invalid {setting} {value:?}: {e}")))
}
