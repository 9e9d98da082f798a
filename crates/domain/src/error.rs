//! Domain error types

use thiserror::Error;

/// Errors raised while constructing a test case, before any network I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The number of template arguments does not match the placeholders.
    #[error("template {template:?} has {expected} placeholder(s) but {got} argument(s) were given")]
    TemplateArity {
        /// The offending template.
        template: String,
        /// Number of distinct placeholders found.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// A regular expression failed to compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// Expected JSON given to a structural comparison does not parse.
    #[error("invalid expected JSON: {0}")]
    InvalidJson(String),

    /// A suffix range (negative `to`) was combined with a nonzero `from`.
    #[error("for a suffix range the start offset must be 0, got {from}")]
    SuffixRangeWithOffset {
        /// The nonzero start offset.
        from: u64,
    },

    /// A suffix range asks for more bytes than the resource holds.
    #[error("suffix range of {suffix} bytes starts before the beginning of a {length}-byte resource")]
    SuffixBeforeStart {
        /// Requested suffix length.
        suffix: u64,
        /// Resource length.
        length: u64,
    },

    /// A range ends at or beyond the resource length.
    #[error("range end {end} is outside a {length}-byte resource")]
    RangeEndBeyondLength {
        /// Resolved end offset.
        end: u64,
        /// Resource length.
        length: u64,
    },

    /// A range starts after it ends.
    #[error("range start {start} is after range end {end}")]
    RangeStartAfterEnd {
        /// Resolved start offset.
        start: u64,
        /// Resolved end offset (may be negative for empty resources).
        end: i64,
    },

    /// No byte ranges were given.
    #[error("at least one byte range is required")]
    EmptyRanges,

    /// A range transform was applied to a request that already has a `Range` header.
    #[error("request for {0:?} already carries a Range header")]
    RangeHeaderAlreadySet(String),

    /// A textual range spec could not be parsed.
    #[error("invalid range spec: {0}")]
    InvalidRangeSpec(String),

    /// The request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
