//! Leaf checks over response bodies.

use serde_json::Value;

use super::{Check, CheckOutput, preview};
use crate::error::{DomainError, DomainResult};

/// Finds `needle` in `haystack` starting at `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize, ignore_case: bool) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| {
            if ignore_case {
                window.eq_ignore_ascii_case(needle)
            } else {
                window == needle
            }
        })
        .map(|pos| pos + from)
}

/// Byte-for-byte equality, for encodings where structural equality is not enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsEqualBytes {
    expected: Vec<u8>,
}

impl IsEqualBytes {
    /// Creates a byte equality check.
    #[must_use]
    pub fn new(expected: impl Into<Vec<u8>>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Check<[u8]> for IsEqualBytes {
    fn check(&self, actual: &[u8]) -> CheckOutput {
        if actual == self.expected.as_slice() {
            return CheckOutput::pass();
        }
        let first_diff = actual
            .iter()
            .zip(&self.expected)
            .position(|(a, e)| a != e)
            .unwrap_or_else(|| actual.len().min(self.expected.len()));
        CheckOutput::fail(format!(
            "expected {} byte(s), got {} byte(s), first difference at offset {first_diff}; got {:?}",
            self.expected.len(),
            actual.len(),
            preview(&String::from_utf8_lossy(actual)),
        ))
    }

    fn describe(&self) -> String {
        format!("equals {} expected byte(s)", self.expected.len())
    }
}

/// Structural JSON equality.
///
/// Objects compare as key/value sets, arrays element-wise in order, scalars
/// by value, so `1` and `1.0` are equal. Whitespace and key order are
/// irrelevant.
#[derive(Debug, Clone, PartialEq)]
pub struct IsJsonEqual {
    expected: Value,
}

impl IsJsonEqual {
    /// Parses the expected document.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidJson`] if `expected` is not JSON.
    pub fn new(expected: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(expected)
            .map(|expected| Self { expected })
            .map_err(|e| DomainError::InvalidJson(e.to_string()))
    }
}

impl Check<[u8]> for IsJsonEqual {
    fn check(&self, actual: &[u8]) -> CheckOutput {
        let actual: Value = match serde_json::from_slice(actual) {
            Ok(value) => value,
            Err(e) => return CheckOutput::fail(format!("body is not valid JSON: {e}")),
        };
        if json_eq(&self.expected, &actual) {
            CheckOutput::pass()
        } else {
            CheckOutput::fail(format!(
                "JSON mismatch: expected {}, got {}",
                self.expected, actual
            ))
        }
    }

    fn describe(&self) -> String {
        format!("is JSON equal to {}", self.expected)
    }
}

fn json_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter()
                    .all(|(key, value)| a.get(key).is_some_and(|other| json_eq(value, other)))
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(x, y)| json_eq(x, y))
        }
        (Value::Number(e), Value::Number(a)) => number_eq(e, a),
        _ => expected == actual,
    }
}

/// Integers compare exactly; anything involving a float compares as `f64`.
#[allow(clippy::float_cmp)]
fn number_eq(expected: &serde_json::Number, actual: &serde_json::Number) -> bool {
    if let (Some(e), Some(a)) = (expected.as_i64(), actual.as_i64()) {
        return e == a;
    }
    if let (Some(e), Some(a)) = (expected.as_u64(), actual.as_u64()) {
        return e == a;
    }
    if expected.is_f64() || actual.is_f64() {
        return matches!((expected.as_f64(), actual.as_f64()), (Some(e), Some(a)) if e == a);
    }
    false
}

/// One part of an ordered containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedPart {
    label: String,
    bytes: Vec<u8>,
    ignore_ascii_case: bool,
}

impl OrderedPart {
    /// A textual marker, matched ignoring ASCII case (header names are case-insensitive).
    #[must_use]
    pub fn marker(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: format!("{text:?}"),
            bytes: text.into_bytes(),
            ignore_ascii_case: true,
        }
    }

    /// An exact byte sequence.
    #[must_use]
    pub fn exact(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
            ignore_ascii_case: false,
        }
    }
}

/// Every part occurs in the body, in the given order, without overlapping.
///
/// Only containment is verified: anything the server puts between parts
/// (boundaries, part headers) is outside the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainsInOrder {
    parts: Vec<OrderedPart>,
}

impl ContainsInOrder {
    /// Creates an ordered containment check.
    #[must_use]
    pub const fn new(parts: Vec<OrderedPart>) -> Self {
        Self { parts }
    }
}

impl Check<[u8]> for ContainsInOrder {
    fn check(&self, actual: &[u8]) -> CheckOutput {
        let mut cursor = 0;
        for (index, part) in self.parts.iter().enumerate() {
            match find(actual, &part.bytes, cursor, part.ignore_ascii_case) {
                Some(pos) => cursor = pos + part.bytes.len(),
                None => {
                    return CheckOutput::fail(format!(
                        "part {} of {} ({}) not found after offset {cursor} in a {}-byte body",
                        index + 1,
                        self.parts.len(),
                        part.label,
                        actual.len()
                    ));
                }
            }
        }
        CheckOutput::pass()
    }

    fn describe(&self) -> String {
        let labels: Vec<&str> = self.parts.iter().map(|p| p.label.as_str()).collect();
        format!("contains in order [{}]", labels.join(", "))
    }
}
