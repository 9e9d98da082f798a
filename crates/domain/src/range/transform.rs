//! Derives range test cases from a base case.
//!
//! The base case describes a plain `GET` of some resource, with whatever
//! assertions it needs except on status, body and `Content-Range`. Each
//! transform clones it, adds a `Range` header and ANDs the oracle's
//! admissible shapes onto the base expectation.

use super::{ByteRange, ByteRanges, RangeOracle};
use crate::case::TestCase;
use crate::error::{DomainError, DomainResult};
use crate::response::{ResponseExpectation, all_of, expect};

const RANGE: &str = "Range";

impl RangeOracle {
    /// A case requesting a single range.
    ///
    /// # Errors
    ///
    /// Fails if the base already sends `Range` or the range does not resolve.
    pub fn single_range_case(
        &self,
        base: &TestCase,
        range: ByteRange,
        content: &[u8],
    ) -> DomainResult<TestCase> {
        ensure_no_range(base)?;
        let derived = self.single(range, content)?;
        Ok(derive(base, &derived.range_header, derived.expectation))
    }

    /// A case requesting every range at once.
    ///
    /// # Errors
    ///
    /// Fails if the base already sends `Range` or a range does not resolve.
    pub fn multi_range_case(
        &self,
        base: &TestCase,
        ranges: &ByteRanges,
        content: &[u8],
    ) -> DomainResult<TestCase> {
        ensure_no_range(base)?;
        let derived = self.multi(ranges, content)?;
        Ok(derive(base, &derived.range_header, derived.expectation))
    }

    /// The single-range case for the first range and the multi-range case
    /// for all of them, named `"<base> - single range"` and
    /// `"<base> - multi range"`.
    ///
    /// # Errors
    ///
    /// Fails if the base already sends `Range` or a range does not resolve.
    pub fn range_cases(
        &self,
        base: &TestCase,
        ranges: &ByteRanges,
        content: &[u8],
    ) -> DomainResult<Vec<TestCase>> {
        let mut single = self.single_range_case(base, ranges.first(), content)?;
        single.name = format!("{} - single range", base.name);

        let mut multi = self.multi_range_case(base, ranges, content)?;
        multi.name = format!("{} - multi range", base.name);

        Ok(vec![single, multi])
    }

    /// [`RangeOracle::range_cases`] preceded by a `"<base> - full request"`
    /// case that sends no `Range` and requires the complete resource.
    ///
    /// # Errors
    ///
    /// Fails if the base already sends `Range` or a range does not resolve.
    pub fn base_with_range_cases(
        &self,
        base: &TestCase,
        ranges: &ByteRanges,
        content: &[u8],
    ) -> DomainResult<Vec<TestCase>> {
        ensure_no_range(base)?;

        let mut full = base.clone();
        full.name = format!("{} - full request", base.name);
        full.response = all_of([
            base.response.clone(),
            expect().status(200).body(content).into(),
        ]);

        let mut cases = vec![full];
        cases.extend(self.range_cases(base, ranges, content)?);
        Ok(cases)
    }
}

/// [`RangeOracle::single_range_case`] with the default policy.
///
/// # Errors
///
/// See [`RangeOracle::single_range_case`].
pub fn single_range_transform(
    base: &TestCase,
    range: ByteRange,
    content: &[u8],
) -> DomainResult<TestCase> {
    RangeOracle::default().single_range_case(base, range, content)
}

/// [`RangeOracle::multi_range_case`] with the default policy.
///
/// # Errors
///
/// See [`RangeOracle::multi_range_case`].
pub fn multi_range_transform(
    base: &TestCase,
    ranges: &ByteRanges,
    content: &[u8],
) -> DomainResult<TestCase> {
    RangeOracle::default().multi_range_case(base, ranges, content)
}

/// [`RangeOracle::range_cases`] with the default policy.
///
/// # Errors
///
/// See [`RangeOracle::range_cases`].
pub fn range_transform(
    base: &TestCase,
    ranges: &ByteRanges,
    content: &[u8],
) -> DomainResult<Vec<TestCase>> {
    RangeOracle::default().range_cases(base, ranges, content)
}

/// [`RangeOracle::base_with_range_cases`] with the default policy.
///
/// # Errors
///
/// See [`RangeOracle::base_with_range_cases`].
pub fn base_with_range_transform(
    base: &TestCase,
    ranges: &ByteRanges,
    content: &[u8],
) -> DomainResult<Vec<TestCase>> {
    RangeOracle::default().base_with_range_cases(base, ranges, content)
}

fn ensure_no_range(base: &TestCase) -> DomainResult<()> {
    if base.request.has_header(RANGE) {
        return Err(DomainError::RangeHeaderAlreadySet(base.name.clone()));
    }
    Ok(())
}

fn derive(
    base: &TestCase,
    range_header: &str,
    admissible: ResponseExpectation,
) -> TestCase {
    let mut case = base.clone();
    case.request = case.request.header(RANGE, range_header);
    case.response = all_of([base.response.clone(), admissible]);
    case
}
