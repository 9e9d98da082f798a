//! Admissible responses to byte-range requests.
//!
//! A server may answer a range request with the full resource, with the
//! requested part, or, for several ranges, with a `multipart/byteranges`
//! body. The oracle turns a request into an `AnyOf` over every shape it is
//! willing to accept.

use super::{ByteRange, ByteRanges, ResolvedRange};
use crate::check::{CheckExt, ContainsInOrder, OrderedPart, is_equal_bytes};
use crate::error::DomainResult;
use crate::response::{ResponseExpectation, any_of, expect, header};
use crate::template::Raw;
use crate::tmpl;

/// Normative reference for range requests.
pub const RANGE_SPEC: &str = "https://httpwg.org/specs/rfc9110.html#field.range";

/// Normative reference for multipart range responses.
pub const MULTIPART_SPEC: &str = "https://httpwg.org/specs/rfc9110.html#multipart.byteranges";

/// How multi-range requests may be answered beyond the protocol-mandated shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiRangePolicy {
    /// A 206 carrying only the first requested range is accepted.
    #[default]
    AcceptFirstRangeOnly,
    /// Only a full 200 or a complete multipart 206 is accepted.
    RequireAllRanges,
}

/// The `Range` header to send and the responses it admits.
#[derive(Debug, Clone)]
pub struct RangeExpectation {
    /// Value of the `Range` request header.
    pub range_header: String,
    /// `AnyOf` over the admissible shapes.
    pub expectation: ResponseExpectation,
}

/// Derives range expectations from the full content.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeOracle {
    policy: MultiRangePolicy,
}

impl RangeOracle {
    /// Creates an oracle with the given multi-range policy.
    #[must_use]
    pub const fn new(policy: MultiRangePolicy) -> Self {
        Self { policy }
    }

    /// The multi-range policy in use.
    #[must_use]
    pub const fn policy(&self) -> MultiRangePolicy {
        self.policy
    }

    /// Expectation for ranges of any cardinality.
    ///
    /// # Errors
    ///
    /// Fails if any range does not resolve against `content`.
    pub fn derive(&self, ranges: &ByteRanges, content: &[u8]) -> DomainResult<RangeExpectation> {
        if ranges.len() == 1 {
            self.single(ranges.first(), content)
        } else {
            self.multi(ranges, content)
        }
    }

    /// Expectation for a single range: the requested part as 206, or the
    /// full resource as 200.
    ///
    /// # Errors
    ///
    /// Fails if the range does not resolve against `content`.
    pub fn single(&self, range: ByteRange, content: &[u8]) -> DomainResult<RangeExpectation> {
        let resolved = range.resolve(content_length(content))?;
        Ok(RangeExpectation {
            range_header: ByteRanges::from(range).header_value(),
            expectation: any_of([partial(resolved, content)?, full(content)]),
        })
    }

    /// Expectation for several ranges: the full resource as 200, optionally
    /// the first range alone as 206, or a multipart 206 with every range in
    /// request order.
    ///
    /// # Errors
    ///
    /// Fails if any range does not resolve against `content`.
    pub fn multi(&self, ranges: &ByteRanges, content: &[u8]) -> DomainResult<RangeExpectation> {
        let resolved = ranges.resolve(content_length(content))?;

        let mut alternatives = vec![full(content)];
        if self.policy == MultiRangePolicy::AcceptFirstRangeOnly {
            alternatives.push(partial(resolved[0], content)?);
        }
        alternatives.push(multipart(&resolved, content)?);

        Ok(RangeExpectation {
            range_header: ranges.header_value(),
            expectation: any_of(alternatives),
        })
    }
}

fn content_length(content: &[u8]) -> u64 {
    content.len() as u64
}

fn content_range(range: ResolvedRange) -> DomainResult<String> {
    tmpl!(
        "bytes {{start}}-{{end}}/{{length}}",
        range.start,
        range.end,
        range.length
    )
}

fn full(content: &[u8]) -> ResponseExpectation {
    expect()
        .status(200)
        .body_with_hint(
            "a 200 response to a range request must carry the complete resource",
            is_equal_bytes(content),
        )
        .into()
}

fn partial(range: ResolvedRange, content: &[u8]) -> DomainResult<ResponseExpectation> {
    let slice = range.slice(content);
    Ok(expect()
        .status(206)
        .header(
            header("Content-Range")
                .equals(content_range(range)?)
                .hint("Content-Range must describe the returned part"),
        )
        .body_check(
            is_equal_bytes(slice)
                .with_hint(tmpl!(
                    "206 body must be exactly bytes {{start}}-{{end}} ({{count}} bytes)",
                    range.start,
                    range.end,
                    range.len()
                )?)
                .with_spec(RANGE_SPEC),
        )
        .into())
}

fn multipart(ranges: &[ResolvedRange], content: &[u8]) -> DomainResult<ResponseExpectation> {
    let mut parts = Vec::with_capacity(ranges.len() * 2);
    for range in ranges {
        let value = content_range(*range)?;
        parts.push(OrderedPart::marker(tmpl!("Content-Range: {{value}}", value)?));
        parts.push(OrderedPart::exact(
            tmpl!(
                "bytes {{start}}-{{end}} {{preview}}",
                range.start,
                range.end,
                Raw(preview(range.slice(content)))
            )?,
            range.slice(content),
        ));
    }

    Ok(expect()
        .status(206)
        .header(
            header("Content-Type")
                .contains("multipart/byteranges")
                .hint("a multipart 206 must declare multipart/byteranges"),
        )
        .body_check(
            ContainsInOrder::new(parts)
                .with_hint("each part must carry its Content-Range followed by its bytes, in request order")
                .with_spec(MULTIPART_SPEC),
        )
        .into())
}

fn preview(bytes: &[u8]) -> &[u8] {
    bytes.get(..16).unwrap_or(bytes)
}
