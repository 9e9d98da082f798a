//! Byte range values and their resolution against a resource length.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A requested byte range.
///
/// `to` absent means "to the end of the resource", `to >= 0` is an explicit
/// inclusive end offset, and `to < 0` asks for the last `-to` bytes (only
/// valid with `from == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    /// Start offset.
    pub from: u64,
    /// End offset, suffix length (negative) or open end (`None`).
    pub to: Option<i64>,
}

impl ByteRange {
    /// Creates a range from raw parts.
    #[must_use]
    pub const fn new(from: u64, to: Option<i64>) -> Self {
        Self { from, to }
    }

    /// `from-to`, both inclusive.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn bounded(from: u64, to: u64) -> Self {
        Self::new(from, Some(to as i64))
    }

    /// `from-`, to the end of the resource.
    #[must_use]
    pub const fn open(from: u64) -> Self {
        Self::new(from, None)
    }

    /// `-length`, the last `length` bytes.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn suffix(length: u64) -> Self {
        Self::new(0, Some(-(length as i64)))
    }

    /// Resolves the range to concrete inclusive offsets.
    ///
    /// An explicit end at or beyond the resource length is an error rather
    /// than being clamped.
    ///
    /// # Errors
    ///
    /// Fails for a suffix range with a nonzero start, a suffix longer than
    /// the resource, an end outside the resource, or a start after the end.
    pub fn resolve(&self, length: u64) -> DomainResult<ResolvedRange> {
        let last = length.checked_sub(1);
        let (start, end) = match self.to {
            Some(to) if to < 0 => {
                if self.from != 0 {
                    return Err(DomainError::SuffixRangeWithOffset { from: self.from });
                }
                let suffix = to.unsigned_abs();
                if suffix > length {
                    return Err(DomainError::SuffixBeforeStart { suffix, length });
                }
                (length - suffix, last)
            }
            Some(to) => (self.from, Some(to.unsigned_abs())),
            None => (self.from, last),
        };

        let Some(end) = end else {
            return Err(DomainError::RangeStartAfterEnd { start, end: -1 });
        };
        if end >= length {
            return Err(DomainError::RangeEndBeyondLength { end, length });
        }
        if start > end {
            return Err(DomainError::RangeStartAfterEnd {
                start,
                end: i64::try_from(end).unwrap_or(i64::MAX),
            });
        }

        Ok(ResolvedRange { start, end, length })
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to {
            None => write!(f, "{}-", self.from),
            Some(to) if to < 0 => write!(f, "-{}", to.unsigned_abs()),
            Some(to) => write!(f, "{}-{to}", self.from),
        }
    }
}

impl FromStr for ByteRange {
    type Err = DomainError;

    /// Parses `a-b`, `a-` or `-n`.
    fn from_str(s: &str) -> DomainResult<Self> {
        let invalid = |why: &str| DomainError::InvalidRangeSpec(format!("{s:?}: {why}"));
        let (start, end) = s.trim().split_once('-').ok_or_else(|| invalid("missing '-'"))?;

        let number = |text: &str| {
            text.trim()
                .parse::<u64>()
                .map_err(|_| invalid("offsets must be non-negative integers"))
        };

        match (start.trim().is_empty(), end.trim().is_empty()) {
            (true, true) => Err(invalid("empty range")),
            (true, false) => {
                let length = number(end)?;
                if length == 0 || i64::try_from(length).is_err() {
                    return Err(invalid("suffix length out of range"));
                }
                Ok(Self::suffix(length))
            }
            (false, true) => Ok(Self::open(number(start)?)),
            (false, false) => {
                let to = i64::try_from(number(end)?).map_err(|_| invalid("end offset too large"))?;
                Ok(Self::new(number(start)?, Some(to)))
            }
        }
    }
}

/// A range resolved to concrete inclusive offsets within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
    /// Total resource length.
    pub length: u64,
}

impl ResolvedRange {
    /// Number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a resolved range covers at least one byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The bytes of `content` covered by this range.
    #[must_use]
    pub fn slice<'a>(&self, content: &'a [u8]) -> &'a [u8] {
        let (Ok(start), Ok(end)) = (usize::try_from(self.start), usize::try_from(self.end)) else {
            return &[];
        };
        content.get(start..=end).unwrap_or_default()
    }
}

/// An ordered, non-empty list of byte ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ByteRange>", into = "Vec<ByteRange>")]
pub struct ByteRanges(Vec<ByteRange>);

impl ByteRanges {
    /// Creates a range list.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyRanges`] when `ranges` is empty.
    pub fn new(ranges: impl IntoIterator<Item = ByteRange>) -> DomainResult<Self> {
        let ranges: Vec<ByteRange> = ranges.into_iter().collect();
        if ranges.is_empty() {
            return Err(DomainError::EmptyRanges);
        }
        Ok(Self(ranges))
    }

    /// The first requested range.
    #[must_use]
    pub fn first(&self) -> ByteRange {
        self.0[0]
    }

    /// Ranges in request order.
    #[must_use]
    pub fn as_slice(&self) -> &[ByteRange] {
        &self.0
    }

    /// Number of ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; see [`ByteRanges::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `Range` request header value, e.g. `bytes=0-99,900-999`.
    #[must_use]
    pub fn header_value(&self) -> String {
        let specs: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        format!("bytes={}", specs.join(","))
    }

    /// Resolves every range, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn resolve(&self, length: u64) -> DomainResult<Vec<ResolvedRange>> {
        self.0.iter().map(|r| r.resolve(length)).collect()
    }
}

impl TryFrom<Vec<ByteRange>> for ByteRanges {
    type Error = DomainError;

    fn try_from(ranges: Vec<ByteRange>) -> DomainResult<Self> {
        Self::new(ranges)
    }
}

impl From<ByteRanges> for Vec<ByteRange> {
    fn from(ranges: ByteRanges) -> Self {
        ranges.0
    }
}

impl From<ByteRange> for ByteRanges {
    fn from(range: ByteRange) -> Self {
        Self(vec![range])
    }
}

impl FromStr for ByteRanges {
    type Err = DomainError;

    /// Parses a comma-separated list, with or without the `bytes=` prefix.
    fn from_str(s: &str) -> DomainResult<Self> {
        let s = s.trim();
        let list = s.strip_prefix("bytes=").unwrap_or(s);
        let ranges = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<DomainResult<Vec<ByteRange>>>()?;
        Self::new(ranges)
    }
}
