//! HTTP byte ranges
//!
//! One value type covers the three places a byte range shows up:
//! the `Range` request header, the `Content-Range` response header, and the
//! goal a resumable download is working towards. All offsets are inclusive
//! on both ends, as in HTTP.

use crate::error::{RangeError, RangeField, RangeResult};
use serde::Serialize;
use std::fmt;

const RANGE_HEADER: &str = "Range";
const CONTENT_RANGE_HEADER: &str = "Content-Range";
const BYTES_UNIT: &str = "bytes";

/// Where a range came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// `Range: bytes=<start>-<end>` as sent by a client
    Request,
    /// `Content-Range: bytes <start>-<end>/<size>` as returned by a server
    Response,
    /// Internally constructed target a download must reach
    Goal,
}

/// An immutable, validated byte range
///
/// Construction always checks `start <= end`, and when a size is present
/// that `size > 0` and `end < size`. Values are never mutated; operations
/// that move the start return a new range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HttpRange {
    kind: RangeKind,
    start: u64,
    end: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl HttpRange {
    /// Creates a request range without a known object size
    pub fn request(start: u64, end: u64) -> RangeResult<Self> {
        Self::build(RangeKind::Request, start, end, None)
    }

    /// Creates a response range carrying the full object size
    pub fn response(start: u64, end: u64, size: u64) -> RangeResult<Self> {
        Self::build(RangeKind::Response, start, end, Some(size))
    }

    /// Creates a goal range carrying the full object size
    pub fn goal(start: u64, end: u64, size: u64) -> RangeResult<Self> {
        Self::build(RangeKind::Goal, start, end, Some(size))
    }

    /// Synthesizes the response range of a whole-object download
    ///
    /// Used when no `Range` was requested and the server only reported a
    /// `Content-Length`.
    pub fn whole_object(content_length: u64) -> RangeResult<Self> {
        if content_length == 0 {
            return Err(RangeError::invalid(
                0,
                0,
                "an empty object has no byte range",
            ));
        }
        Self::response(0, content_length - 1, content_length)
    }

    fn build(kind: RangeKind, start: u64, end: u64, size: Option<u64>) -> RangeResult<Self> {
        if start > end {
            return Err(RangeError::invalid(start, end, "start is after end"));
        }

        if let Some(size) = size {
            if size == 0 {
                return Err(RangeError::invalid(start, end, "size must be positive"));
            }
            if end >= size {
                return Err(RangeError::invalid(
                    start,
                    end,
                    format!("end lies beyond object size {}", size),
                ));
            }
        }

        Ok(Self {
            kind,
            start,
            end,
            size,
        })
    }

    /// Parses a `Range` request header of the form `bytes=<start>-<end>`
    ///
    /// Open-ended, suffix and multi-range forms are rejected.
    pub fn parse_request(raw: &str) -> RangeResult<Self> {
        let trimmed = raw.trim();

        let spec = match trimmed.split_once('=') {
            Some((unit, spec)) if unit.trim().eq_ignore_ascii_case(BYTES_UNIT) => spec.trim(),
            Some(_) => {
                return Err(RangeError::malformed(
                    RANGE_HEADER,
                    raw,
                    "range unit must be bytes",
                ))
            }
            None => {
                return Err(RangeError::malformed(
                    RANGE_HEADER,
                    raw,
                    "expected bytes=<start>-<end>",
                ))
            }
        };

        if spec.contains(',') {
            return Err(RangeError::malformed(
                RANGE_HEADER,
                raw,
                "multiple ranges are not supported",
            ));
        }

        let (start, end) = split_span(RANGE_HEADER, raw, spec)?;
        Self::request(start, end)
    }

    /// Parses a `Content-Range` response header of the form
    /// `bytes <start>-<end>/<size>`
    pub fn parse_content_range(raw: &str) -> RangeResult<Self> {
        let trimmed = raw.trim();

        let (unit, rest) = trimmed.split_once(char::is_whitespace).ok_or_else(|| {
            RangeError::malformed(
                CONTENT_RANGE_HEADER,
                raw,
                "expected bytes <start>-<end>/<size>",
            )
        })?;

        if !unit.eq_ignore_ascii_case(BYTES_UNIT) {
            return Err(RangeError::malformed(
                CONTENT_RANGE_HEADER,
                raw,
                "range unit must be bytes",
            ));
        }

        let (span, size) = rest.trim_start().split_once('/').ok_or_else(|| {
            RangeError::malformed(CONTENT_RANGE_HEADER, raw, "missing /<size>")
        })?;

        if span == "*" {
            return Err(RangeError::malformed(
                CONTENT_RANGE_HEADER,
                raw,
                "unsatisfied range",
            ));
        }
        if size == "*" {
            return Err(RangeError::malformed(
                CONTENT_RANGE_HEADER,
                raw,
                "complete length is unknown",
            ));
        }

        let (start, end) = split_span(CONTENT_RANGE_HEADER, raw, span)?;
        let size = parse_offset(CONTENT_RANGE_HEADER, raw, size, "size")?;
        Self::response(start, end, size)
    }

    pub fn kind(&self) -> RangeKind {
        self.kind
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Full object size, when the range carries one
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Number of bytes covered by the range
    pub fn length(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    /// Returns a range of the same kind starting at `start`
    pub fn with_start(&self, start: u64) -> RangeResult<Self> {
        Self::build(self.kind, start, self.end, self.size)
    }

    /// Drops the size and returns the equivalent request range
    pub fn to_request(&self) -> Self {
        Self {
            kind: RangeKind::Request,
            start: self.start,
            end: self.end,
            size: None,
        }
    }

    /// Converts a sized range into a goal
    pub fn to_goal(&self) -> RangeResult<Self> {
        match self.size {
            Some(size) => Self::goal(self.start, self.end, size),
            None => Err(RangeError::invalid(
                self.start,
                self.end,
                "a goal range needs the object size",
            )),
        }
    }

    /// True when start, end and (if both carry one) size agree
    pub fn matches(&self, other: &HttpRange) -> bool {
        self.validate_against(other).is_ok()
    }

    /// Checks that `actual` describes the same slice as `self`
    ///
    /// Size is only compared when both ranges carry one.
    pub fn validate_against(&self, actual: &HttpRange) -> RangeResult<()> {
        if self.start != actual.start {
            return Err(RangeError::Mismatch {
                field: RangeField::Start,
                expected: self.start,
                actual: actual.start,
            });
        }

        if self.end != actual.end {
            return Err(RangeError::Mismatch {
                field: RangeField::End,
                expected: self.end,
                actual: actual.end,
            });
        }

        if let (Some(expected), Some(actual)) = (self.size, actual.size) {
            if expected != actual {
                return Err(RangeError::Mismatch {
                    field: RangeField::Size,
                    expected,
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Renders the header value for this range
    ///
    /// Request ranges render in `Range` form, sized ranges in
    /// `Content-Range` form.
    pub fn render(&self) -> String {
        match self.size {
            Some(size) => format!("{} {}-{}/{}", BYTES_UNIT, self.start, self.end, size),
            None => format!("{}={}-{}", BYTES_UNIT, self.start, self.end),
        }
    }
}

impl fmt::Display for HttpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn split_span(header: &'static str, raw: &str, span: &str) -> RangeResult<(u64, u64)> {
    let (start, end) = span
        .split_once('-')
        .ok_or_else(|| RangeError::malformed(header, raw, "expected <start>-<end>"))?;

    let start = parse_offset(header, raw, start, "start")?;
    let end = parse_offset(header, raw, end, "end")?;
    Ok((start, end))
}

/// Parses an unsigned offset made of ASCII digits only
fn parse_offset(header: &'static str, raw: &str, text: &str, what: &str) -> RangeResult<u64> {
    if text.is_empty() {
        return Err(RangeError::malformed(header, raw, format!("{} is missing", what)));
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::malformed(
            header,
            raw,
            format!("{} is not a number", what),
        ));
    }
    text.parse::<u64>()
        .map_err(|_| RangeError::malformed(header, raw, format!("{} does not fit in 64 bits", what)))
}
