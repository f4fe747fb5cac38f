//! Byte-range specifications and their resolution against a file size.
//!
//! A [`RangeSpec`] captures what the client asked for (whole file, explicit
//! bounds, or a suffix length). [`RangeSpec::resolve`] turns it into a
//! concrete inclusive [`ResolvedRange`] once the file size is known, and is
//! the single place where unsatisfiable ranges are rejected.
//!
//! Accepted header forms:
//! - `bytes=0-499`
//! - `bytes=500-` (from 500 to end)
//! - `bytes=-500` (last 500 bytes)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A client-supplied byte range request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeSpec {
    /// No range requested: the whole file.
    #[default]
    Unspecified,
    /// `bytes=start-end` or `bytes=start-`.
    Explicit {
        /// First byte offset (inclusive).
        start: u64,
        /// Last byte offset (inclusive); `None` means "to the end".
        end: Option<u64>,
    },
    /// `bytes=-n`: the last `n` bytes of the file.
    Suffix(u64),
}

/// A validated, inclusive byte interval within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ResolvedRange {
    /// Number of bytes covered by the range.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Whether this range covers an entire file of `size` bytes.
    pub fn is_full(&self, size: u64) -> bool {
        self.start == 0 && self.end + 1 == size
    }

    /// `Content-Range` header value for a partial response.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// `Content-Range` header value for a 416 response.
pub fn unsatisfied_content_range(total: u64) -> String {
    format!("bytes */{total}")
}

impl RangeSpec {
    /// Parse an optional `Range` header value.
    ///
    /// A missing header means [`RangeSpec::Unspecified`]. Malformed values
    /// are rejected with [`Error::InvalidRange`].
    pub fn parse_header(value: Option<&str>) -> Result<Self> {
        match value {
            None => Ok(RangeSpec::Unspecified),
            Some(v) => v.parse(),
        }
    }

    /// Resolve this spec against a file of `size` bytes.
    pub fn resolve(&self, size: u64) -> Result<ResolvedRange> {
        if size == 0 {
            return Err(Error::invalid_range("file is empty", Some(size)));
        }
        let last = size - 1;

        let (start, end) = match *self {
            RangeSpec::Unspecified => (0, last),
            RangeSpec::Explicit { start, end } => (start, end.map_or(last, |e| e.min(last))),
            RangeSpec::Suffix(n) => (size.saturating_sub(n), last),
        };

        if start >= size {
            return Err(Error::invalid_range(
                format!("start {start} is beyond file size {size}"),
                Some(size),
            ));
        }
        if start > end {
            return Err(Error::invalid_range(
                format!("start {start} is after end {end}"),
                Some(size),
            ));
        }

        Ok(ResolvedRange { start, end })
    }
}

impl FromStr for RangeSpec {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let malformed = || Error::invalid_range(format!("malformed range header '{value}'"), None);

        let (unit, set) = value.trim().split_once('=').ok_or_else(malformed)?;
        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return Err(malformed());
        }
        if set.contains(',') {
            return Err(Error::invalid_range("multiple ranges are not supported", None));
        }

        let (start, end) = set.split_once('-').ok_or_else(malformed)?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, false) => Ok(RangeSpec::Suffix(parse_offset(end).ok_or_else(malformed)?)),
            (false, true) => Ok(RangeSpec::Explicit {
                start: parse_offset(start).ok_or_else(malformed)?,
                end: None,
            }),
            (false, false) => {
                let start = parse_offset(start).ok_or_else(malformed)?;
                let end = parse_offset(end).ok_or_else(malformed)?;
                if start > end {
                    return Err(Error::invalid_range(
                        format!("start {start} is after end {end}"),
                        None,
                    ));
                }
                Ok(RangeSpec::Explicit {
                    start,
                    end: Some(end),
                })
            }
            (true, true) => Err(malformed()),
        }
    }
}

/// Digits only: `u64::from_str` would also accept a leading `+`.
fn parse_offset(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::Unspecified => write!(f, "bytes=0-"),
            RangeSpec::Explicit { start, end: Some(end) } => write!(f, "bytes={start}-{end}"),
            RangeSpec::Explicit { start, end: None } => write!(f, "bytes={start}-"),
            RangeSpec::Suffix(n) => write!(f, "bytes=-{n}"),
        }
    }
}
