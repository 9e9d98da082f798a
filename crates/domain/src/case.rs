//! Test case definition.

use crate::check::CheckOutput;
use crate::request::RequestSpec;
use crate::response::{Expect, Response, ResponseExpectation};

/// A named request together with the responses it admits.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Case name, shown in reports.
    pub name: String,
    /// What a failure most likely means.
    pub hint: Option<String>,
    /// Links to the normative text the case verifies.
    pub spec_refs: Vec<String>,
    /// The request to send.
    pub request: RequestSpec,
    /// Admissible responses.
    pub response: ResponseExpectation,
}

impl TestCase {
    /// Creates a case that sends `GET /` and accepts any response.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: None,
            spec_refs: Vec::new(),
            request: RequestSpec::new(),
            response: ResponseExpectation::Expect(Expect::new()),
        }
    }

    /// Sets the hint.
    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Adds a spec reference.
    #[must_use]
    pub fn spec(mut self, spec: impl Into<String>) -> Self {
        self.spec_refs.push(spec.into());
        self
    }

    /// Sets the request.
    #[must_use]
    pub fn request(mut self, request: RequestSpec) -> Self {
        self.request = request;
        self
    }

    /// Sets the response expectation.
    #[must_use]
    pub fn response(mut self, response: impl Into<ResponseExpectation>) -> Self {
        self.response = response.into();
        self
    }

    /// Session slots written when this case passes.
    #[must_use]
    pub fn capture_slots(&self) -> Vec<String> {
        self.response.capture_slots()
    }

    /// Evaluates a response, attaching the case's hint and spec references
    /// to a failure that carries none of its own.
    #[must_use]
    pub fn evaluate(&self, response: &Response) -> CheckOutput {
        let mut output = self.response.evaluate(response);
        if output.success {
            return output;
        }
        if output.hint.is_none() {
            output.hint.clone_from(&self.hint);
        }
        if output.spec.is_none() && !self.spec_refs.is_empty() {
            output.spec = Some(self.spec_refs.join(", "));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::expect;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_case_accepts_anything() {
        let case = TestCase::new("anything");
        assert!(case.evaluate(&Response::new(500)).success);
        assert_eq!(case.request.path, "/");
    }

    #[test]
    fn test_failure_carries_case_hint_and_refs() {
        let case = TestCase::new("GET /ipfs/bafy returns 200")
            .hint("gateway should serve the fixture")
            .spec("https://specs.ipfs.tech/http-gateways/path-gateway/")
            .request(RequestSpec::get("/ipfs/bafy"))
            .response(expect().status(200));

        let output = case.evaluate(&Response::new(404));
        assert!(!output.success);
        assert_eq!(output.hint.as_deref(), Some("gateway should serve the fixture"));
        assert_eq!(
            output.spec.as_deref(),
            Some("https://specs.ipfs.tech/http-gateways/path-gateway/")
        );
    }
}
