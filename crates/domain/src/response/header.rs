//! Header expectations.

use std::sync::Arc;

use regex::Regex;

use super::Response;
use crate::check::{
    Captures, Check, CheckOutput, Checks, Contains, Equals, Exists, Not, SharedCheck, preview,
};
use crate::error::{DomainError, DomainResult};

/// What a single header value must look like.
///
/// The common shapes (literal, pattern, hinted) are explicit variants;
/// anything else from the check algebra goes through [`HeaderExpectation::Check`].
#[derive(Clone)]
pub enum HeaderExpectation {
    /// Exact value.
    Literal(String),
    /// Regular expression the value must match.
    Pattern(Regex),
    /// An expectation with a diagnostic hint attached.
    Wrapped(Box<HeaderExpectation>, String),
    /// Arbitrary check over the value.
    Check(SharedCheck<str>),
}

impl HeaderExpectation {
    /// Evaluates the expectation against a header value (empty if absent).
    #[must_use]
    pub fn evaluate(&self, actual: &str) -> CheckOutput {
        match self {
            Self::Literal(expected) => Equals::new(expected.as_str()).check(actual),
            Self::Pattern(regex) => {
                if regex.is_match(actual) {
                    CheckOutput::pass()
                } else {
                    CheckOutput::fail(format!(
                        "{:?} does not match pattern /{}/",
                        preview(actual),
                        regex.as_str()
                    ))
                }
            }
            Self::Wrapped(inner, hint) => {
                let mut output = inner.evaluate(actual);
                if !output.success {
                    output.hint = Some(match output.hint.take() {
                        Some(nested) => format!("{}; {nested}", hint.trim()),
                        None => hint.clone(),
                    });
                }
                output
            }
            Self::Check(check) => check.check(actual),
        }
    }
}

impl Check<str> for HeaderExpectation {
    fn check(&self, actual: &str) -> CheckOutput {
        self.evaluate(actual)
    }

    fn describe(&self) -> String {
        match self {
            Self::Literal(expected) => format!("equals {expected:?}"),
            Self::Pattern(regex) => format!("matches /{}/", regex.as_str()),
            Self::Wrapped(inner, _) => inner.describe(),
            Self::Check(check) => check.describe(),
        }
    }

    fn capture_slots(&self) -> Vec<String> {
        match self {
            Self::Literal(_) | Self::Pattern(_) => Vec::new(),
            Self::Wrapped(inner, _) => inner.capture_slots(),
            Self::Check(check) => check.capture_slots(),
        }
    }
}

impl std::fmt::Debug for HeaderExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Pattern(r) => f.debug_tuple("Pattern").field(&r.as_str()).finish(),
            Self::Wrapped(inner, hint) => f.debug_tuple("Wrapped").field(inner).field(hint).finish(),
            Self::Check(c) => f.debug_tuple("Check").field(&c.describe()).finish(),
        }
    }
}

/// A named header together with its expectation.
#[derive(Debug, Clone)]
pub struct HeaderCheck {
    name: String,
    expectation: HeaderExpectation,
}

impl HeaderCheck {
    /// Creates a header check.
    #[must_use]
    pub fn new(name: impl Into<String>, expectation: HeaderExpectation) -> Self {
        Self {
            name: name.into(),
            expectation,
        }
    }

    /// Header name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The expectation on the value.
    #[must_use]
    pub const fn expectation(&self) -> &HeaderExpectation {
        &self.expectation
    }

    /// Attaches a diagnostic hint.
    #[must_use]
    pub fn hint(self, hint: impl Into<String>) -> Self {
        Self {
            name: self.name,
            expectation: HeaderExpectation::Wrapped(Box::new(self.expectation), hint.into()),
        }
    }

    /// Inverts the expectation.
    #[must_use]
    pub fn negate(self) -> Self {
        Self {
            name: self.name,
            expectation: HeaderExpectation::Check(Arc::new(Not::new(self.expectation))),
        }
    }

    /// Evaluates against a response. Failures are prefixed by the header name.
    #[must_use]
    pub fn evaluate(&self, response: &Response) -> CheckOutput {
        let output = self
            .expectation
            .evaluate(response.header_or_empty(&self.name));
        if output.success {
            output
        } else {
            output.context(&self.name)
        }
    }

    /// Session slots this header check may capture into.
    #[must_use]
    pub fn capture_slots(&self) -> Vec<String> {
        self.expectation.capture_slots()
    }
}

/// Starts a header check for `name`.
///
/// ```
/// use conformance_domain::response::{header, Response};
///
/// let check = header("Content-Type").contains("text/plain").hint("plain text expected");
/// let response = Response::new(200).with_header("content-type", "text/plain; charset=utf-8");
/// assert!(check.evaluate(&response).success);
/// ```
#[must_use]
pub fn header(name: impl Into<String>) -> HeaderBuilder {
    HeaderBuilder { name: name.into() }
}

/// Chooses the expectation for a header.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    name: String,
}

impl HeaderBuilder {
    /// Exact value.
    #[must_use]
    pub fn equals(self, value: impl Into<String>) -> HeaderCheck {
        HeaderCheck::new(self.name, HeaderExpectation::Literal(value.into()))
    }

    /// Value matches a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPattern`] if the pattern does not compile.
    pub fn matches(self, pattern: &str) -> DomainResult<HeaderCheck> {
        let regex = Regex::new(pattern).map_err(|e| DomainError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(HeaderCheck::new(self.name, HeaderExpectation::Pattern(regex)))
    }

    /// Value contains a substring.
    #[must_use]
    pub fn contains(self, needle: impl Into<String>) -> HeaderCheck {
        self.satisfies(Contains::new(needle))
    }

    /// Value does not contain a substring (an absent header passes).
    #[must_use]
    pub fn not_contains(self, needle: impl Into<String>) -> HeaderCheck {
        self.satisfies(Not::new(Contains::new(needle)))
    }

    /// Header is present and non-empty.
    #[must_use]
    pub fn exists(self) -> HeaderCheck {
        self.satisfies(Exists)
    }

    /// Header is absent or empty.
    #[must_use]
    pub fn absent(self) -> HeaderCheck {
        self.satisfies(Not::new(Exists))
    }

    /// Value satisfies a predicate.
    #[must_use]
    pub fn checks<F>(self, description: impl Into<String>, predicate: F) -> HeaderCheck
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.satisfies(Checks::new(description, predicate))
    }

    /// Captures the value into a session slot.
    #[must_use]
    pub fn captures(self, slot: impl Into<String>) -> HeaderCheck {
        self.satisfies(Captures::new(slot))
    }

    /// Value satisfies an arbitrary check.
    #[must_use]
    pub fn satisfies<C: Check<str> + 'static>(self, check: C) -> HeaderCheck {
        HeaderCheck::new(self.name, HeaderExpectation::Check(Arc::new(check)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::check::{And, contains};
    use pretty_assertions::assert_eq;

    fn response() -> Response {
        Response::new(200)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_header("Etag", "\"bafy.raw\"")
    }

    #[test]
    fn test_literal_and_pattern() {
        assert!(header("etag").equals("\"bafy.raw\"").evaluate(&response()).success);
        assert!(
            header("Content-Type")
                .matches(r"^text/plain")
                .unwrap()
                .evaluate(&response())
                .success
        );
        assert!(header("X").matches("(").is_err());
    }

    #[test]
    fn test_failure_is_prefixed_with_name() {
        let output = header("Content-Type").equals("text/html").evaluate(&response());
        assert!(!output.success);
        assert_eq!(
            output.reason,
            "Content-Type: expected \"text/html\", got \"text/plain; charset=utf-8\""
        );
    }

    #[test]
    fn test_absent_header_is_empty() {
        assert!(!header("Location").exists().evaluate(&response()).success);
        assert!(header("Location").absent().evaluate(&response()).success);
        assert!(header("Location").not_contains("x").evaluate(&response()).success);
        let output = header("Location").equals("/a").evaluate(&response());
        assert_eq!(output.reason, "Location: expected \"/a\", got \"\"");
    }

    #[test]
    fn test_hint_wraps_without_changing_outcome() {
        let check = header("Content-Type").equals("text/html").hint("should be html");
        assert!(matches!(check.expectation(), HeaderExpectation::Wrapped(..)));
        let output = check.evaluate(&response());
        assert!(!output.success);
        assert_eq!(output.hint.as_deref(), Some("should be html"));

        let passing = header("Etag").exists().hint("unused");
        let output = passing.evaluate(&response());
        assert!(output.success);
        assert_eq!(output.hint, None);
    }

    #[test]
    fn test_not_inverts_any_variant() {
        assert!(header("Content-Type").equals("text/html").negate().evaluate(&response()).success);
        assert!(!header("Etag").exists().negate().evaluate(&response()).success);
    }

    #[test]
    fn test_satisfies_composes_with_algebra() {
        let check = header("Content-Type")
            .satisfies(And::new().with(contains("text/")).with(contains("charset")));
        assert!(check.evaluate(&response()).success);
    }

    #[test]
    fn test_capture_returns_value_and_slot() {
        let check = header("Etag").captures("etag").hint("etag required");
        assert_eq!(check.capture_slots(), vec!["etag".to_string()]);
        let output = check.evaluate(&response());
        assert!(output.success);
        assert_eq!(output.captures[0].value, "\"bafy.raw\"");
    }
}
