//! Observed responses and what they are expected to look like.

mod expectation;
mod header;
mod spec;

pub use expectation::{Expect, ResponseExpectation, all_of, any_of, expect};
pub use header::{HeaderBuilder, HeaderCheck, HeaderExpectation, header};
pub use spec::Response;
