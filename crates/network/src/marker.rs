// crates/network/src/marker.rs
//! Identity and progress of one resumable download

use crate::error::{NetworkError, NetworkResult};
use stowage_core::{HttpRange, RangeError, RangeField, RangeResult};

/// Records which object generation is being downloaded and which bytes are
/// still missing
///
/// The target range never changes. The current range starts out equal to
/// the target and only ever moves its start forward; each move swaps in a
/// new validated range value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumableDownloadMarker {
    etag: String,
    target: HttpRange,
    current: HttpRange,
}

impl ResumableDownloadMarker {
    /// Creates a marker from the first response's ETag and range
    ///
    /// `range` must carry the object size (a `Content-Range` or a range
    /// derived from `Content-Length`).
    pub fn new(etag: impl Into<String>, range: HttpRange) -> NetworkResult<Self> {
        let etag = etag.into();
        if etag.trim().is_empty() {
            return Err(NetworkError::UnexpectedResponse(
                "ETag must not be blank".to_string(),
            ));
        }

        Ok(Self {
            etag,
            target: range.to_goal()?,
            current: range.to_request(),
        })
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// The range negotiated by the first response
    pub fn target_range(&self) -> &HttpRange {
        &self.target
    }

    /// The range the next resumption request will ask for
    pub fn current_range(&self) -> &HttpRange {
        &self.current
    }

    /// Bytes not yet accounted for by `update_range_start`
    pub fn remaining(&self) -> u64 {
        self.current.length()
    }

    /// Bytes accounted for since the download started
    pub fn delivered(&self) -> u64 {
        self.current.start() - self.target.start()
    }

    /// Moves the current start forward by the bytes delivered since the
    /// previous start
    ///
    /// Fails when the new start would pass the end of the range, i.e. there
    /// is nothing left to resume.
    pub fn update_range_start(&mut self, bytes_delivered: u64) -> RangeResult<()> {
        let start = self.current.start();
        let end = self.current.end();

        let new_start = start
            .checked_add(bytes_delivered)
            .filter(|s| *s <= end)
            .ok_or(RangeError::Exhausted {
                start,
                advance: bytes_delivered,
                end,
            })?;

        self.current = self.current.with_start(new_start)?;
        Ok(())
    }

    /// Checks a continuation's `Content-Range` against the current range
    pub fn validate_response_range(&self, response: &HttpRange) -> NetworkResult<()> {
        let result = self
            .current
            .validate_against(response)
            .and_then(|()| validate_size(&self.target, response));

        result.map_err(|e| {
            NetworkError::UnexpectedResponse(format!(
                "expected content range {} of {} but server sent {} ({})",
                self.current, self.target, response, e
            ))
        })
    }

    /// Value for the `Range` header of the next resumption request
    pub fn range_header(&self) -> String {
        self.current.render()
    }
}

/// Sizes are compared only when both ranges carry one
fn validate_size(expected: &HttpRange, actual: &HttpRange) -> RangeResult<()> {
    match (expected.size(), actual.size()) {
        (Some(expected), Some(actual)) if expected != actual => Err(RangeError::Mismatch {
            field: RangeField::Size,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(start: u64, end: u64, size: u64) -> ResumableDownloadMarker {
        let range = HttpRange::response(start, end, size).unwrap();
        ResumableDownloadMarker::new("\"abc123\"", range).unwrap()
    }

    #[test]
    fn test_new_marker() {
        let marker = marker(0, 999, 1000);
        assert_eq!(marker.etag(), "\"abc123\"");
        assert_eq!(marker.current_range().start(), 0);
        assert_eq!(marker.current_range().end(), 999);
        assert_eq!(marker.target_range().size(), Some(1000));
        assert_eq!(marker.range_header(), "bytes=0-999");
        assert_eq!(marker.remaining(), 1000);
        assert_eq!(marker.delivered(), 0);
    }

    #[test]
    fn test_blank_etag_rejected() {
        let range = HttpRange::whole_object(10).unwrap();
        assert!(ResumableDownloadMarker::new("  ", range).is_err());
    }

    #[test]
    fn test_range_without_size_rejected() {
        let range = HttpRange::request(0, 9).unwrap();
        assert!(ResumableDownloadMarker::new("etag", range).is_err());
    }

    #[test]
    fn test_update_range_start_advances_only_start() {
        let mut marker = marker(100, 599, 1000);
        let target = *marker.target_range();

        marker.update_range_start(50).unwrap();
        assert_eq!(marker.current_range().start(), 150);
        assert_eq!(marker.current_range().end(), 599);

        marker.update_range_start(400).unwrap();
        assert_eq!(marker.current_range().start(), 550);
        assert_eq!(marker.current_range().end(), 599);
        assert_eq!(marker.delivered(), 450);
        assert_eq!(marker.range_header(), "bytes=550-599");

        assert_eq!(*marker.target_range(), target);
    }

    #[test]
    fn test_update_range_start_past_end_fails() {
        let mut marker = marker(0, 9, 10);
        let err = marker.update_range_start(10).unwrap_err();
        assert!(matches!(err, RangeError::Exhausted { start: 0, advance: 10, end: 9 }));
        assert_eq!(marker.current_range().start(), 0);

        assert!(marker.update_range_start(u64::MAX).is_err());
    }

    #[test]
    fn test_validate_response_range() {
        let mut marker = marker(0, 999, 1000);
        marker.update_range_start(250).unwrap();

        let good = HttpRange::parse_content_range("bytes 250-999/1000").unwrap();
        assert!(marker.validate_response_range(&good).is_ok());

        let wrong_start = HttpRange::parse_content_range("bytes 0-999/1000").unwrap();
        let err = marker.validate_response_range(&wrong_start).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bytes=250-999"));
        assert!(msg.contains("bytes 0-999/1000"));

        let wrong_size = HttpRange::parse_content_range("bytes 250-999/2000").unwrap();
        assert!(marker.validate_response_range(&wrong_size).is_err());
    }
}
