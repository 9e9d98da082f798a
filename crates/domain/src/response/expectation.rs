//! Response expectations and their evaluation.
//!
//! An [`Expect`] describes one admissible response shape. [`ResponseExpectation`]
//! combines shapes: `AllOf` requires every member, `AnyOf` accepts any single
//! member. Several legal server behaviors for one request are expressed as an
//! `AnyOf` over their shapes.

use std::sync::Arc;

use super::{HeaderCheck, Response};
use crate::check::{Annotated, Check, CheckOutput, IsEqualBytes, SharedCheck};

/// One admissible response shape.
#[derive(Clone, Default)]
pub struct Expect {
    status: Option<u16>,
    headers: Vec<HeaderCheck>,
    body: Option<SharedCheck<[u8]>>,
}

impl Expect {
    /// An expectation that any response satisfies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a status code.
    #[must_use]
    pub const fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a header check.
    #[must_use]
    pub fn header(mut self, check: HeaderCheck) -> Self {
        self.headers.push(check);
        self
    }

    /// Adds several header checks, evaluated in order.
    #[must_use]
    pub fn headers(mut self, checks: impl IntoIterator<Item = HeaderCheck>) -> Self {
        self.headers.extend(checks);
        self
    }

    /// Requires the body to equal `bytes` exactly.
    #[must_use]
    pub fn body(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body_check(IsEqualBytes::new(bytes))
    }

    /// Requires the body to satisfy a check.
    #[must_use]
    pub fn body_check<C: Check<[u8]> + 'static>(mut self, check: C) -> Self {
        self.body = Some(Arc::new(check));
        self
    }

    /// Requires the body to satisfy a check, with a hint for failures.
    #[must_use]
    pub fn body_with_hint<C: Check<[u8]> + 'static>(self, hint: impl Into<String>, check: C) -> Self {
        self.body_check(Annotated::new(check).hint(hint))
    }

    /// Expected status, if any.
    #[must_use]
    pub const fn expected_status(&self) -> Option<u16> {
        self.status
    }

    /// Header checks in evaluation order.
    #[must_use]
    pub fn header_checks(&self) -> &[HeaderCheck] {
        &self.headers
    }

    /// Evaluates against a response.
    ///
    /// Status first, then headers in order, then the body. The first failure
    /// is reported.
    #[must_use]
    pub fn evaluate(&self, response: &Response) -> CheckOutput {
        if let Some(expected) = self.status
            && response.status != expected
        {
            return CheckOutput::fail(format!(
                "status code mismatch: expected {expected} got {}",
                response.status
            ));
        }

        let mut captures = Vec::new();
        for check in &self.headers {
            let output = check.evaluate(response);
            if !output.success {
                return output;
            }
            captures.extend(output.captures);
        }

        if let Some(body) = &self.body {
            let output = body.check(response.body.as_slice());
            if !output.success {
                return output.context("body");
            }
            captures.extend(output.captures);
        }

        let mut output = CheckOutput::pass();
        output.captures = captures;
        output
    }

    fn capture_slots(&self) -> Vec<String> {
        let mut slots: Vec<String> = self
            .headers
            .iter()
            .flat_map(HeaderCheck::capture_slots)
            .collect();
        if let Some(body) = &self.body {
            slots.extend(body.capture_slots());
        }
        slots
    }
}

impl std::fmt::Debug for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expect")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|b| b.describe()))
            .finish()
    }
}

/// Starts an [`Expect`] builder.
#[must_use]
pub fn expect() -> Expect {
    Expect::new()
}

/// A tree of response shapes.
#[derive(Debug, Clone)]
pub enum ResponseExpectation {
    /// A single shape.
    Expect(Expect),
    /// Every member must hold.
    AllOf(Vec<ResponseExpectation>),
    /// At least one member must hold.
    AnyOf(Vec<ResponseExpectation>),
}

impl ResponseExpectation {
    /// Evaluates against a response.
    ///
    /// Every member of a composite is evaluated so that failures carry the
    /// full diagnostic chain. Captures propagate from successful branches
    /// only: all members of a passing `AllOf`, the first matching member of
    /// a passing `AnyOf`.
    #[must_use]
    pub fn evaluate(&self, response: &Response) -> CheckOutput {
        match self {
            Self::Expect(expect) => expect.evaluate(response),
            Self::AllOf(members) => {
                let outputs: Vec<CheckOutput> =
                    members.iter().map(|m| m.evaluate(response)).collect();
                let failed: Vec<(usize, &CheckOutput)> = outputs
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| !o.success)
                    .collect();

                if failed.is_empty() {
                    let mut output = CheckOutput::pass();
                    output.captures = outputs.into_iter().flat_map(|o| o.captures).collect();
                    return output;
                }

                let details: Vec<String> = failed
                    .iter()
                    .map(|(i, o)| format!("[{}] {}", i + 1, indent(&o.diagnostic())))
                    .collect();
                CheckOutput::fail(format!(
                    "{} of {} required expectation(s) failed:\n  {}",
                    failed.len(),
                    members.len(),
                    details.join("\n  ")
                ))
            }
            Self::AnyOf(members) => {
                let outputs: Vec<CheckOutput> =
                    members.iter().map(|m| m.evaluate(response)).collect();

                if let Some(matched) = outputs.iter().find(|o| o.success) {
                    let mut output = CheckOutput::pass();
                    output.captures.clone_from(&matched.captures);
                    return output;
                }
                if members.is_empty() {
                    return CheckOutput::fail("no admissible response shapes");
                }

                let details: Vec<String> = outputs
                    .iter()
                    .enumerate()
                    .map(|(i, o)| format!("[{}] {}", i + 1, indent(&o.diagnostic())))
                    .collect();
                CheckOutput::fail(format!(
                    "response matched none of {} admissible shape(s):\n  {}",
                    members.len(),
                    details.join("\n  ")
                ))
            }
        }
    }

    /// Every session slot this expectation may capture into.
    ///
    /// A slot shared by alternatives of one `AnyOf` is listed once.
    #[must_use]
    pub fn capture_slots(&self) -> Vec<String> {
        let all = match self {
            Self::Expect(expect) => expect.capture_slots(),
            Self::AllOf(members) | Self::AnyOf(members) => members
                .iter()
                .flat_map(Self::capture_slots)
                .collect(),
        };
        let mut slots = Vec::with_capacity(all.len());
        for slot in all {
            if !slots.contains(&slot) {
                slots.push(slot);
            }
        }
        slots
    }
}

impl From<Expect> for ResponseExpectation {
    fn from(expect: Expect) -> Self {
        Self::Expect(expect)
    }
}

/// Every member must hold.
#[must_use]
pub fn all_of(members: impl IntoIterator<Item = ResponseExpectation>) -> ResponseExpectation {
    ResponseExpectation::AllOf(members.into_iter().collect())
}

/// At least one member must hold.
#[must_use]
pub fn any_of(members: impl IntoIterator<Item = ResponseExpectation>) -> ResponseExpectation {
    ResponseExpectation::AnyOf(members.into_iter().collect())
}

fn indent(text: &str) -> String {
    text.replace('\n', "\n    ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::check::{Check, CheckOutput, contains};
    use crate::response::header;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ok_text() -> Response {
        Response::new(200)
            .with_header("Content-Type", "text/plain")
            .with_header("Etag", "\"abc\"")
            .with_body("hello")
    }

    #[test]
    fn test_status_mismatch_message() {
        let output = expect().status(206).evaluate(&ok_text());
        assert!(!output.success);
        assert_eq!(output.reason, "status code mismatch: expected 206 got 200");
    }

    #[test]
    fn test_headers_in_order_first_failure_wins() {
        let output = expect()
            .status(200)
            .headers([
                header("Content-Type").equals("text/plain"),
                header("Cache-Control").exists(),
                header("Etag").equals("nope"),
            ])
            .evaluate(&ok_text());
        assert!(!output.success);
        assert!(output.reason.starts_with("Cache-Control: "));
    }

    #[test]
    fn test_body_checked_last() {
        let exp = expect().status(200).body("hello");
        assert!(exp.evaluate(&ok_text()).success);

        let output = expect()
            .body_with_hint("body should mention world", contains("world"))
            .evaluate(&ok_text());
        assert!(!output.success);
        assert!(output.reason.starts_with("body: "));
        assert_eq!(output.hint.as_deref(), Some("body should mention world"));
    }

    #[test]
    fn test_any_of_reports_every_alternative() {
        let exp = any_of([
            expect().status(206).into(),
            expect().status(200).body("bye").into(),
        ]);
        let output = exp.evaluate(&ok_text());
        assert!(!output.success);
        assert!(output.reason.contains("none of 2 admissible shape(s)"));
        assert!(output.reason.contains("[1] status code mismatch: expected 206 got 200"));
        assert!(output.reason.contains("[2] body: "));
    }

    #[test]
    fn test_all_of_reports_failing_members() {
        let exp = all_of([
            expect().status(200).into(),
            expect().header(header("Etag").equals("x")).into(),
            expect().status(404).into(),
        ]);
        let output = exp.evaluate(&ok_text());
        assert!(!output.success);
        assert!(output.reason.starts_with("2 of 3 required expectation(s) failed"));
        assert!(!output.reason.contains("[1]"));
        assert!(output.reason.contains("[2] Etag: "));
        assert!(output.reason.contains("[3] status code mismatch"));
    }

    #[test]
    fn test_captures_only_from_successful_branches() {
        let exp = any_of([
            expect().status(206).header(header("Etag").captures("tag")).into(),
            expect().status(200).header(header("Etag").captures("tag")).into(),
        ]);
        assert_eq!(exp.capture_slots(), vec!["tag".to_string()]);
        let output = exp.evaluate(&ok_text());
        assert!(output.success);
        assert_eq!(output.captures.len(), 1);
        assert_eq!(output.captures[0].value, "\"abc\"");

        let failing = all_of([
            expect().header(header("Etag").captures("tag")).into(),
            expect().status(500).into(),
        ]);
        let output = failing.evaluate(&ok_text());
        assert!(!output.success);
        assert!(output.captures.is_empty());
    }

    #[test]
    fn test_nested_diagnostics_are_preserved() {
        let exp = all_of([any_of([
            expect().status(206).into(),
            expect().header(header("Content-Type").equals("a").hint("nested hint")).into(),
        ])]);
        let output = exp.evaluate(&ok_text());
        assert!(!output.success);
        assert!(output.reason.contains("nested hint"));
        assert!(output.reason.contains("expected 206 got 200"));
    }

    struct Fixed(bool);

    impl Check<[u8]> for Fixed {
        fn check(&self, _actual: &[u8]) -> CheckOutput {
            if self.0 {
                CheckOutput::pass()
            } else {
                CheckOutput::fail("fixed failure")
            }
        }

        fn describe(&self) -> String {
            format!("fixed({})", self.0)
        }
    }

    fn leaf(pass: bool) -> ResponseExpectation {
        expect().body_check(Fixed(pass)).into()
    }

    proptest! {
        #[test]
        fn prop_all_of_is_conjunction(flags in prop::collection::vec(any::<bool>(), 0..6)) {
            let exp = all_of(flags.iter().map(|&f| leaf(f)));
            prop_assert_eq!(exp.evaluate(&ok_text()).success, flags.iter().all(|&f| f));
        }

        #[test]
        fn prop_any_of_is_disjunction(flags in prop::collection::vec(any::<bool>(), 0..6)) {
            let exp = any_of(flags.iter().map(|&f| leaf(f)));
            prop_assert_eq!(exp.evaluate(&ok_text()).success, flags.iter().any(|&f| f));
        }

        #[test]
        fn prop_any_of_failure_lists_every_alternative(n in 1usize..6) {
            let exp = any_of((0..n).map(|_| leaf(false)));
            let output = exp.evaluate(&ok_text());
            prop_assert!(!output.success);
            for i in 1..=n {
                let marker = format!("[{i}] ");
                prop_assert!(output.reason.contains(&marker));
            }
        }
    }
}
