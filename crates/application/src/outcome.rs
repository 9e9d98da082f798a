//! Case outcomes and run reports.

use serde::Serialize;

/// Why a case failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The case could not be built.
    Construction,
    /// No response was obtained.
    Transport,
    /// The response matched no admissible shape.
    Mismatch,
    /// An earlier step of the same chain failed.
    Skipped,
}

/// The result of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOutcome {
    /// Case name.
    pub name: String,
    /// Whether the case passed.
    pub passed: bool,
    /// Failure explanation, including hints and spec references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Failure classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Wall time spent on the case.
    pub duration_ms: u64,
}

impl CaseOutcome {
    /// A passing outcome.
    #[must_use]
    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            passed: true,
            diagnostic: None,
            failure: None,
            duration_ms,
        }
    }

    /// A failing outcome.
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        kind: FailureKind,
        diagnostic: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            diagnostic: Some(diagnostic.into()),
            failure: Some(kind),
            duration_ms,
        }
    }

    /// A step not run because `prerequisite` failed.
    #[must_use]
    pub fn skipped(name: impl Into<String>, prerequisite: &str) -> Self {
        Self::failed(
            name,
            FailureKind::Skipped,
            format!("skipped: prerequisite {prerequisite:?} failed"),
            0,
        )
    }
}

/// Results of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Outcomes in suite order.
    pub outcomes: Vec<CaseOutcome>,
    /// Number of cases.
    pub total: usize,
    /// Number of passed cases.
    pub passed: usize,
    /// Number of failed cases.
    pub failed: usize,
    /// Wall time of the run.
    pub duration_ms: u64,
}

impl SuiteReport {
    /// Builds a report from outcomes.
    #[must_use]
    pub fn new(outcomes: Vec<CaseOutcome>, duration_ms: u64) -> Self {
        let total = outcomes.len();
        let passed = outcomes.iter().filter(|o| o.passed).count();

        Self {
            outcomes,
            total,
            passed,
            failed: total - passed,
            duration_ms,
        }
    }

    /// Whether every case passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// The failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// Looks up an outcome by case name.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_counts() {
        let report = SuiteReport::new(
            vec![
                CaseOutcome::passed("a", 3),
                CaseOutcome::failed("b", FailureKind::Mismatch, "status code mismatch", 4),
                CaseOutcome::skipped("c", "b"),
            ],
            10,
        );
        assert_eq!((report.total, report.passed, report.failed), (3, 1, 2));
        assert!(!report.all_passed());
        assert_eq!(report.failures().count(), 2);
        assert_eq!(
            report.outcome("c").and_then(|o| o.diagnostic.as_deref()),
            Some("skipped: prerequisite \"b\" failed")
        );
    }

    #[test]
    fn test_empty_report_passes() {
        assert!(SuiteReport::new(Vec::new(), 0).all_passed());
    }
}
