//! Leaf checks over header values.

use std::fmt;

use regex::Regex;

use super::{Check, CheckOutput, preview};
use crate::error::{DomainError, DomainResult};

/// Exact equality. Header values are compared as-is, without case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equals {
    expected: String,
}

impl Equals {
    /// Creates an equality check.
    #[must_use]
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Check<str> for Equals {
    fn check(&self, actual: &str) -> CheckOutput {
        if actual == self.expected {
            CheckOutput::pass()
        } else {
            CheckOutput::fail(format!(
                "expected {:?}, got {:?}",
                self.expected,
                preview(actual)
            ))
        }
    }

    fn describe(&self) -> String {
        format!("equals {:?}", self.expected)
    }
}

/// Containment of a substring in a header value, or of its bytes in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contains {
    needle: String,
}

impl Contains {
    /// Creates a containment check.
    #[must_use]
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl Check<str> for Contains {
    fn check(&self, actual: &str) -> CheckOutput {
        if actual.contains(&self.needle) {
            CheckOutput::pass()
        } else {
            CheckOutput::fail(format!(
                "expected {:?} to contain {:?}",
                preview(actual),
                self.needle
            ))
        }
    }

    fn describe(&self) -> String {
        format!("contains {:?}", self.needle)
    }
}

impl Check<[u8]> for Contains {
    fn check(&self, actual: &[u8]) -> CheckOutput {
        if super::body::find(actual, self.needle.as_bytes(), 0, false).is_some() {
            CheckOutput::pass()
        } else {
            CheckOutput::fail(format!(
                "body {:?} does not contain {:?}",
                preview(&String::from_utf8_lossy(actual)),
                self.needle
            ))
        }
    }

    fn describe(&self) -> String {
        format!("contains {:?}", self.needle)
    }
}

/// Regular-expression match.
#[derive(Debug, Clone)]
pub struct Matches {
    regex: Regex,
}

impl Matches {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPattern`] if the pattern is invalid.
    pub fn new(pattern: &str) -> DomainResult<Self> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|e| DomainError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    /// The pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Check<str> for Matches {
    fn check(&self, actual: &str) -> CheckOutput {
        if self.regex.is_match(actual) {
            CheckOutput::pass()
        } else {
            CheckOutput::fail(format!(
                "{:?} does not match pattern /{}/",
                preview(actual),
                self.regex.as_str()
            ))
        }
    }

    fn describe(&self) -> String {
        format!("matches /{}/", self.regex.as_str())
    }
}

/// The value is present and non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exists;

impl Check<str> for Exists {
    fn check(&self, actual: &str) -> CheckOutput {
        if actual.is_empty() {
            CheckOutput::fail("expected a value, got nothing")
        } else {
            CheckOutput::pass()
        }
    }

    fn describe(&self) -> String {
        "exists".to_string()
    }
}

/// Wraps an arbitrary predicate.
///
/// Used for assertions that are not string-shaped, such as parsing a
/// `Cache-Control` directive set and checking a numeric threshold.
pub struct Checks<F> {
    description: String,
    predicate: F,
}

impl<F> Checks<F> {
    /// Creates a predicate check.
    #[must_use]
    pub fn new(description: impl Into<String>, predicate: F) -> Self {
        Self {
            description: description.into(),
            predicate,
        }
    }
}

impl<F> fmt::Debug for Checks<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checks")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized, F> Check<T> for Checks<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn check(&self, actual: &T) -> CheckOutput {
        if (self.predicate)(actual) {
            CheckOutput::pass()
        } else {
            CheckOutput::fail(format!("value does not satisfy {}", self.description))
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Captures the observed value into a named session slot.
///
/// The check itself stays pure: it succeeds when the value is non-empty and
/// returns the value in [`CheckOutput::captures`]. Storing it is the
/// executor's job, once the whole case has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    slot: String,
}

impl Captures {
    /// Creates a capturing check for `slot`.
    #[must_use]
    pub fn new(slot: impl Into<String>) -> Self {
        Self { slot: slot.into() }
    }
}

impl Check<str> for Captures {
    fn check(&self, actual: &str) -> CheckOutput {
        if actual.is_empty() {
            CheckOutput::fail(format!("nothing to capture into {:?}", self.slot))
        } else {
            CheckOutput::pass().with_capture(&self.slot, actual)
        }
    }

    fn describe(&self) -> String {
        format!("captured into {:?}", self.slot)
    }

    fn capture_slots(&self) -> Vec<String> {
        vec![self.slot.clone()]
    }
}
