//! Request description and resolution.

mod method;
mod spec;

pub use method::HttpMethod;
pub use spec::{RequestSpec, ResolvedRequest};
