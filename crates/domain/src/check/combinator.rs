//! Composite checks.
//!
//! `And` and `Or` evaluate every child, even after the outcome is known, so
//! a failure always carries complete diagnostics.

use std::fmt;
use std::sync::Arc;

use super::{Check, CheckOutput, SharedCheck};

/// Inverts a check.
pub struct Not<T: ?Sized> {
    inner: SharedCheck<T>,
}

impl<T: ?Sized + 'static> Not<T> {
    /// Wraps a check.
    #[must_use]
    pub fn new<C: Check<T> + 'static>(check: C) -> Self {
        Self {
            inner: Arc::new(check),
        }
    }
}

impl<T: ?Sized> Check<T> for Not<T> {
    fn check(&self, actual: &T) -> CheckOutput {
        if self.inner.check(actual).success {
            CheckOutput::fail(format!(
                "unexpected match: value was not supposed to satisfy ({})",
                self.inner.describe()
            ))
        } else {
            CheckOutput::pass()
        }
    }

    fn describe(&self) -> String {
        format!("not ({})", self.inner.describe())
    }
}

/// Conjunction: every child must hold.
pub struct And<T: ?Sized> {
    checks: Vec<SharedCheck<T>>,
}

impl<T: ?Sized + 'static> And<T> {
    /// An empty conjunction, which holds trivially.
    #[must_use]
    pub const fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Builds a conjunction from already-shared checks.
    #[must_use]
    pub const fn from_shared(checks: Vec<SharedCheck<T>>) -> Self {
        Self { checks }
    }

    /// Adds a child check.
    #[must_use]
    pub fn with<C: Check<T> + 'static>(mut self, check: C) -> Self {
        self.checks.push(Arc::new(check));
        self
    }
}

impl<T: ?Sized + 'static> Default for And<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Check<T> for And<T> {
    fn check(&self, actual: &T) -> CheckOutput {
        let outputs: Vec<CheckOutput> = self.checks.iter().map(|c| c.check(actual)).collect();

        if let Some(failed) = outputs.iter().find(|o| !o.success) {
            return failed.clone();
        }

        let mut combined = CheckOutput::pass();
        combined.captures = outputs.into_iter().flat_map(|o| o.captures).collect();
        combined
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.checks.iter().map(|c| c.describe()).collect();
        format!("all of [{}]", parts.join(", "))
    }

    fn capture_slots(&self) -> Vec<String> {
        self.checks.iter().flat_map(|c| c.capture_slots()).collect()
    }
}

/// Disjunction: at least one child must hold.
pub struct Or<T: ?Sized> {
    checks: Vec<SharedCheck<T>>,
}

impl<T: ?Sized + 'static> Or<T> {
    /// An empty disjunction, which never holds.
    #[must_use]
    pub const fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Builds a disjunction from already-shared checks.
    #[must_use]
    pub const fn from_shared(checks: Vec<SharedCheck<T>>) -> Self {
        Self { checks }
    }

    /// Adds an alternative.
    #[must_use]
    pub fn with<C: Check<T> + 'static>(mut self, check: C) -> Self {
        self.checks.push(Arc::new(check));
        self
    }
}

impl<T: ?Sized + 'static> Default for Or<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Check<T> for Or<T> {
    fn check(&self, actual: &T) -> CheckOutput {
        let outputs: Vec<CheckOutput> = self.checks.iter().map(|c| c.check(actual)).collect();

        // Captures come from the first alternative that held.
        if let Some(matched) = outputs.iter().find(|o| o.success) {
            let mut combined = CheckOutput::pass();
            combined.captures.clone_from(&matched.captures);
            return combined;
        }

        let reasons: Vec<String> = outputs
            .iter()
            .enumerate()
            .map(|(i, o)| format!("[{}] {}", i + 1, o.diagnostic()))
            .collect();
        CheckFailure::none_matched(self.checks.len(), &reasons)
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.checks.iter().map(|c| c.describe()).collect();
        format!("any of [{}]", parts.join(", "))
    }

    fn capture_slots(&self) -> Vec<String> {
        self.checks.iter().flat_map(|c| c.capture_slots()).collect()
    }
}

struct CheckFailure;

impl CheckFailure {
    fn none_matched(count: usize, reasons: &[String]) -> CheckOutput {
        if count == 0 {
            return CheckOutput::fail("no alternatives to satisfy");
        }
        CheckOutput::fail(format!(
            "none of {count} alternative(s) matched:\n{}",
            reasons.join("\n")
        ))
    }
}

/// Attaches a hint and/or spec reference to a check.
pub struct Annotated<T: ?Sized> {
    inner: SharedCheck<T>,
    hint: Option<String>,
    spec: Option<String>,
}

impl<T: ?Sized + 'static> Annotated<T> {
    /// Wraps a check without annotations.
    #[must_use]
    pub fn new<C: Check<T> + 'static>(check: C) -> Self {
        Self {
            inner: Arc::new(check),
            hint: None,
            spec: None,
        }
    }

    /// Sets the hint.
    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Sets the spec reference.
    #[must_use]
    pub fn spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }
}

impl<T: ?Sized> Check<T> for Annotated<T> {
    fn check(&self, actual: &T) -> CheckOutput {
        let mut output = self.inner.check(actual);
        if output.success {
            return output;
        }
        if let Some(hint) = &self.hint {
            output.hint = Some(match output.hint.take() {
                Some(inner) => format!("{}; {}", hint.trim(), inner),
                None => hint.clone(),
            });
        }
        if output.spec.is_none() {
            output.spec.clone_from(&self.spec);
        }
        output
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn capture_slots(&self) -> Vec<String> {
        self.inner.capture_slots()
    }
}

impl<T: ?Sized> fmt::Debug for Annotated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotated")
            .field("check", &self.inner.describe())
            .field("hint", &self.hint)
            .field("spec", &self.spec)
            .finish()
    }
}
