//! Error types for byte-range handling
//!
//! Parsing failures and validation failures are kept apart so callers can
//! tell a malformed header from a well-formed header that describes the
//! wrong slice of an object.

use std::fmt;
use thiserror::Error;

/// Result type for range operations
pub type RangeResult<T> = Result<T, RangeError>;

/// The component of a range that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    Start,
    End,
    Size,
}

impl fmt::Display for RangeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::Size => write!(f, "size"),
        }
    }
}

/// Errors produced while parsing, building or comparing byte ranges
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Header text does not have the expected shape
    #[error("Malformed {header} header {input:?}: {reason}")]
    Malformed {
        header: &'static str,
        input: String,
        reason: String,
    },

    /// Offsets violate the range invariants
    #[error("Invalid byte range {start}-{end}: {reason}")]
    Invalid { start: u64, end: u64, reason: String },

    /// Two ranges that should describe the same slice disagree
    #[error("Range {field} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        field: RangeField,
        expected: u64,
        actual: u64,
    },

    /// Advancing the start would move it past the end of the range
    #[error("Cannot advance range start by {advance} from {start}: range ends at {end}")]
    Exhausted { start: u64, advance: u64, end: u64 },
}

impl RangeError {
    pub(crate) fn malformed(
        header: &'static str,
        input: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Malformed {
            header,
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(start: u64, end: u64, reason: impl Into<String>) -> Self {
        Self::Invalid {
            start,
            end,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_includes_input() {
        let err = RangeError::malformed("Content-Range", "bytes x-y/z", "start is not a number");
        let msg = err.to_string();
        assert!(msg.contains("Content-Range"));
        assert!(msg.contains("bytes x-y/z"));
    }

    #[test]
    fn test_mismatch_names_field() {
        let err = RangeError::Mismatch {
            field: RangeField::End,
            expected: 999,
            actual: 500,
        };
        assert_eq!(err.to_string(), "Range end mismatch: expected 999, got 500");
    }

    #[test]
    fn test_exhausted_display() {
        let err = RangeError::Exhausted {
            start: 10,
            advance: 20,
            end: 19,
        };
        assert!(err.to_string().contains("ends at 19"));
    }
}
