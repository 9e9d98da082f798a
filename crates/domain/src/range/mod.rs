//! Byte-range semantics: range values, the response oracle and case transforms.

mod byte_range;
mod oracle;
mod transform;

pub use byte_range::{ByteRange, ByteRanges, ResolvedRange};
pub use oracle::{MULTIPART_SPEC, MultiRangePolicy, RANGE_SPEC, RangeExpectation, RangeOracle};
pub use transform::{
    base_with_range_transform, multi_range_transform, range_transform, single_range_transform,
};
