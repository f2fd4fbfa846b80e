//! `Range` request header parsing.
//!
//! Only a single contiguous `bytes=<start>-[<end>]` window is understood.
//! When a client sends several comma separated ranges, the first one is
//! served and the rest are ignored; `multipart/byteranges` is never produced.

use thiserror::Error;

const BYTES_UNIT: &str = "bytes=";

/// A contiguous window into a resource: `length` bytes starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(start: u64, length: u64) -> Self {
        ByteRange { start, length }
    }

    /// The window covering a whole resource of `total` bytes.
    pub fn full(total: u64) -> Self {
        ByteRange { start: 0, length: total }
    }

    /// Inclusive position of the last byte, `None` for an empty window.
    pub fn last(&self) -> Option<u64> {
        (self.start + self.length).checked_sub(1)
    }
}

/// Result of interpreting the `Range` header against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub range: ByteRange,
    /// `true` when the header was present and the response is `206`.
    pub partial: bool,
}

/// Why a `Range` header could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range is not expressed in bytes")]
    MissingUnit,
    #[error("invalid byte position {0:?}")]
    InvalidNumber(String),
    #[error("range end {end} precedes start {start}")]
    StartBeyondEnd { start: u64, end: u64 },
    #[error("range start {start} is beyond resource length {total}")]
    Unsatisfiable { start: u64, total: u64 },
}

/// Parses an optional `Range` header value for a resource of `total` bytes.
///
/// No header selects the whole resource. `bytes=A-B` selects `B - A + 1`
/// bytes from `A`, `bytes=A-` everything from `A` to the end. An end past
/// the last byte is clamped to it; a start at or past `total` fails.
pub fn parse_range(header: Option<&str>, total: u64) -> Result<RangeSpec, RangeError> {
    let Some(header) = header else {
        return Ok(RangeSpec { range: ByteRange::full(total), partial: false });
    };

    let spec = header
        .trim()
        .strip_prefix(BYTES_UNIT)
        .ok_or(RangeError::MissingUnit)?;

    // multi-range requests degrade to their first range
    let first = spec.split(',').next().unwrap_or_default().trim();

    let mut bounds = first.splitn(2, '-');
    let start = parse_position(bounds.next().unwrap_or_default())?;
    let end = match bounds.next().map(str::trim) {
        Some(end) if !end.is_empty() => Some(parse_position(end)?),
        // no dash at all is not a range
        None => return Err(RangeError::InvalidNumber(first.to_string())),
        Some(_) => None,
    };

    if start >= total {
        return Err(RangeError::Unsatisfiable { start, total });
    }

    let length = match end {
        Some(end) if end < start => return Err(RangeError::StartBeyondEnd { start, end }),
        Some(end) => end.min(total - 1) - start + 1,
        None => total - start,
    };

    Ok(RangeSpec { range: ByteRange::new(start, length), partial: true })
}

fn parse_position(token: &str) -> Result<u64, RangeError> {
    let token = token.trim();
    // u64::from_str accepts a leading '+', byte positions are DIGIT only
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::InvalidNumber(token.to_string()));
    }
    token
        .parse::<u64>()
        .map_err(|_| RangeError::InvalidNumber(token.to_string()))
}
