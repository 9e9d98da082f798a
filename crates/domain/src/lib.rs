//! Conformance Domain - checks, expectations and range semantics
//!
//! This crate defines what a conformance test case is and how a response is
//! judged against it. Everything here is pure Rust with no I/O: requests are
//! described, not sent, and responses are evaluated, not received.
//!
//! - [`template`]: `{{name}}` substitution shared by requests and expectations
//! - [`check`]: composable predicates over header values and bodies
//! - [`response`]: response shapes and `AllOf`/`AnyOf` composition
//! - [`range`]: byte-range resolution and the admissible-response oracle
//! - [`case`]: a named request with its admissible responses

pub mod case;
pub mod check;
pub mod error;
pub mod range;
pub mod request;
pub mod response;
pub mod template;

pub use case::TestCase;
pub use check::{Check, CheckExt, CheckOutput, SharedCheck};
pub use error::{DomainError, DomainResult};
pub use range::{ByteRange, ByteRanges, MultiRangePolicy, RangeOracle};
pub use request::{HttpMethod, RequestSpec, ResolvedRequest};
pub use response::{Expect, HeaderCheck, Response, ResponseExpectation, all_of, any_of, expect, header};
