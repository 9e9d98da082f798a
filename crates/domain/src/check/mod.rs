//! Composable pass/fail predicates over header values and bodies.
//!
//! A [`Check`] is a pure function from an observed value to a
//! [`CheckOutput`]. Header checks work on `str`, body checks on `[u8]`.
//! Leaves and combinators share the same contract, so any check can be
//! nested inside [`Not`], [`And`] or [`Or`] and evaluated on its own.
//!
//! Hints and spec references are diagnostic metadata. They are surfaced in
//! failure diagnostics and never change `success`.
//!
//! ```
//! use conformance_domain::check::{contains, not, And, Check};
//!
//! let listing = And::new()
//!     .with(contains("Index of"))
//!     .with(not(contains(r#"<a href="/">..</a>"#)));
//!
//! assert!(listing.check("Index of /ipfs/bafy").success);
//! assert!(!listing.check(r#"Index of <a href="/">..</a>"#).success);
//! ```

mod body;
mod combinator;
mod text;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use body::{ContainsInOrder, IsEqualBytes, IsJsonEqual, OrderedPart};
pub use combinator::{And, Annotated, Not, Or};
pub use text::{Captures, Checks, Contains, Equals, Exists, Matches};

use crate::error::DomainResult;

/// A value observed by a capturing check, destined for a session slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Name of the session slot.
    pub slot: String,
    /// Captured value.
    pub value: String,
}

/// Result of evaluating a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutput {
    /// Whether the check held.
    pub success: bool,
    /// Explanation, always set on failure.
    pub reason: String,
    /// Diagnostic hint attached to the failing check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Spec reference attached to the failing check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Values captured by successful capturing checks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<Capture>,
}

impl CheckOutput {
    /// A successful output with no reason.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// A failed output.
    #[must_use]
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            ..Self::default()
        }
    }

    /// Adds a captured value.
    #[must_use]
    pub fn with_capture(mut self, slot: impl Into<String>, value: impl Into<String>) -> Self {
        self.captures.push(Capture {
            slot: slot.into(),
            value: value.into(),
        });
        self
    }

    /// Prefixes the reason with some context, e.g. the header name.
    #[must_use]
    pub fn context(mut self, context: impl AsRef<str>) -> Self {
        self.reason = format!("{}: {}", context.as_ref(), self.reason);
        self
    }

    /// Renders the reason with its hint and spec reference.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let mut out = self.reason.clone();
        if let Some(hint) = &self.hint {
            out.push_str("\n  hint: ");
            out.push_str(hint.trim());
        }
        if let Some(spec) = &self.spec {
            out.push_str("\n  spec: ");
            out.push_str(spec);
        }
        out
    }
}

/// A pure predicate over a value of type `T`.
pub trait Check<T: ?Sized>: Send + Sync {
    /// Evaluates the check against an observed value.
    fn check(&self, actual: &T) -> CheckOutput;

    /// Short human-readable form, used in composite diagnostics.
    fn describe(&self) -> String;

    /// Session slots this check may write when it succeeds.
    fn capture_slots(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A shareable, type-erased check.
pub type SharedCheck<T> = Arc<dyn Check<T>>;

impl<T: ?Sized> Check<T> for Arc<dyn Check<T>> {
    fn check(&self, actual: &T) -> CheckOutput {
        self.as_ref().check(actual)
    }

    fn describe(&self) -> String {
        self.as_ref().describe()
    }

    fn capture_slots(&self) -> Vec<String> {
        self.as_ref().capture_slots()
    }
}

/// Builder extensions available on every check.
pub trait CheckExt<T: ?Sized + 'static>: Check<T> + Sized + 'static {
    /// Attaches a diagnostic hint.
    #[must_use]
    fn with_hint(self, hint: impl Into<String>) -> Annotated<T> {
        Annotated::new(self).hint(hint)
    }

    /// Attaches a spec reference.
    #[must_use]
    fn with_spec(self, spec: impl Into<String>) -> Annotated<T> {
        Annotated::new(self).spec(spec)
    }

    /// Erases the concrete type.
    #[must_use]
    fn shared(self) -> SharedCheck<T> {
        Arc::new(self)
    }
}

impl<T: ?Sized + 'static, C: Check<T> + Sized + 'static> CheckExt<T> for C {}

/// Exact string equality.
#[must_use]
pub fn equals(expected: impl Into<String>) -> Equals {
    Equals::new(expected)
}

/// Substring (or byte subsequence) containment.
#[must_use]
pub fn contains(needle: impl Into<String>) -> Contains {
    Contains::new(needle)
}

/// Regular-expression match.
///
/// # Errors
///
/// Returns [`crate::DomainError::InvalidPattern`] if the pattern does not compile.
pub fn matches(pattern: &str) -> DomainResult<Matches> {
    Matches::new(pattern)
}

/// Value is present and non-empty.
#[must_use]
pub const fn exists() -> Exists {
    Exists
}

/// Inverts a check.
#[must_use]
pub fn not<T: ?Sized + 'static, C: Check<T> + 'static>(check: C) -> Not<T> {
    Not::new(check)
}

/// Escape hatch over an arbitrary predicate.
#[must_use]
pub fn checks<T: ?Sized, F>(description: impl Into<String>, predicate: F) -> Checks<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    Checks::new(description, predicate)
}

/// Captures a non-empty value into a session slot.
#[must_use]
pub fn captures(slot: impl Into<String>) -> Captures {
    Captures::new(slot)
}

/// Structural JSON equality.
///
/// # Errors
///
/// Returns [`crate::DomainError::InvalidJson`] if `expected` is not JSON.
pub fn is_json_equal(expected: &[u8]) -> DomainResult<IsJsonEqual> {
    IsJsonEqual::new(expected)
}

/// Byte-for-byte equality.
#[must_use]
pub fn is_equal_bytes(expected: impl Into<Vec<u8>>) -> IsEqualBytes {
    IsEqualBytes::new(expected)
}

/// Ordered containment of several parts.
#[must_use]
pub fn contains_in_order(parts: Vec<OrderedPart>) -> ContainsInOrder {
    ContainsInOrder::new(parts)
}

/// Shortens a value for display in a failure reason.
pub(crate) fn preview(value: &str) -> String {
    const LIMIT: usize = 100;
    if value.chars().count() > LIMIT {
        let head: String = value.chars().take(LIMIT).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}
