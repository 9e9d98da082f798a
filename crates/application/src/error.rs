//! Application error types

use conformance_domain::DomainError;
use thiserror::Error;

use crate::ports::HttpClientError;
use crate::session::SessionError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A test case could not be constructed.
    #[error("construction error: {0}")]
    Domain(#[from] DomainError),

    /// The request could not be exchanged with the server.
    #[error("transport error: {0}")]
    Transport(#[from] HttpClientError),

    /// A session slot was misused.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The suite is malformed.
    #[error("invalid suite: {0}")]
    Suite(String),

    /// The run configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
