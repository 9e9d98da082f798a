//! Suites, chains and steps.
//!
//! A suite is a list of chains. Chains run concurrently with each other;
//! the steps of one chain run in order, so a later step can build its
//! request from values an earlier step captured.

use std::collections::HashMap;
use std::fmt;

use conformance_domain::TestCase;

use crate::error::{ApplicationError, ApplicationResult};
use crate::session::SessionContext;

/// Builds a case from the session once earlier steps have run.
pub type CaseBuilder = Box<dyn FnOnce(&SessionContext) -> ApplicationResult<TestCase> + Send>;

/// One step of a chain.
pub enum Step {
    /// A case known up front.
    Ready(TestCase),
    /// A case built at run time from captured values.
    Deferred {
        /// Name reported if building fails.
        name: String,
        /// The builder.
        build: CaseBuilder,
    },
}

impl Step {
    /// Creates a deferred step.
    #[must_use]
    pub fn deferred<F>(name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&SessionContext) -> ApplicationResult<TestCase> + Send + 'static,
    {
        Self::Deferred {
            name: name.into(),
            build: Box::new(build),
        }
    }

    /// The name of the step.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(case) => &case.name,
            Self::Deferred { name, .. } => name,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(case) => f.debug_tuple("Ready").field(&case.name).finish(),
            Self::Deferred { name, .. } => f.debug_struct("Deferred").field("name", name).finish_non_exhaustive(),
        }
    }
}

impl From<TestCase> for Step {
    fn from(case: TestCase) -> Self {
        Self::Ready(case)
    }
}

/// Steps that run sequentially.
#[derive(Debug, Default)]
pub struct Chain {
    steps: Vec<Step>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Appends a deferred step.
    #[must_use]
    pub fn then_build<F>(self, name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&SessionContext) -> ApplicationResult<TestCase> + Send + 'static,
    {
        self.then(Step::deferred(name, build))
    }

    /// The steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

/// A set of chains to run.
#[derive(Debug, Default)]
pub struct Suite {
    chains: Vec<Chain>,
}

impl Suite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an independent case.
    #[must_use]
    pub fn case(self, case: TestCase) -> Self {
        self.chain(Chain::new().then(case))
    }

    /// Adds independent cases.
    #[must_use]
    pub fn cases(self, cases: impl IntoIterator<Item = TestCase>) -> Self {
        cases.into_iter().fold(self, Self::case)
    }

    /// Adds a chain.
    #[must_use]
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Number of steps across all chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.iter().map(|c| c.steps.len()).sum()
    }

    /// Whether the suite has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects suites in which two ready cases capture into the same slot.
    ///
    /// Deferred steps are only known at run time; a conflicting write there
    /// fails the step that attempts it.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Suite`] naming the slot and both cases.
    pub fn validate(&self) -> ApplicationResult<()> {
        let mut producers: HashMap<String, &str> = HashMap::new();
        for step in self.chains.iter().flat_map(|c| &c.steps) {
            let Step::Ready(case) = step else { continue };
            for slot in case.capture_slots() {
                if let Some(first) = producers.insert(slot.clone(), &case.name) {
                    return Err(ApplicationError::Suite(format!(
                        "capture slot {slot:?} is written by both {first:?} and {:?}",
                        case.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_chains(self) -> Vec<Chain> {
        self.chains
    }
}
