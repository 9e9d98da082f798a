//! HTTP client port

use async_trait::async_trait;
use conformance_domain::{ResolvedRequest, Response};
use thiserror::Error;

/// Transport failures. Each one fails only the case that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpClientError {
    /// No response within the configured time.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport rejected the URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for exchanging one request with the server under test.
///
/// Implementations must not follow redirects or retry: the harness judges
/// exactly the response the server sent.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, connection failure or an unreadable body.
    async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpClientError>;
}
