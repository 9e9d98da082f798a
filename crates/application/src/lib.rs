//! Conformance Application - running suites against a server
//!
//! This crate orchestrates conformance runs:
//! - Ports (traits) for the HTTP transport
//! - The write-once session shared by sequenced steps
//! - Suites, chains and the run-suite use case
//! - Outcomes and reports

pub mod config;
pub mod error;
pub mod outcome;
pub mod ports;
pub mod session;
pub mod suite;
pub mod use_cases;

pub use config::RunConfig;
pub use error::{ApplicationError, ApplicationResult};
pub use outcome::{CaseOutcome, FailureKind, SuiteReport};
pub use ports::{HttpClient, HttpClientError};
pub use session::{SessionContext, SessionError};
pub use suite::{CaseBuilder, Chain, Step, Suite};
pub use use_cases::RunSuite;
