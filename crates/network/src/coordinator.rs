// crates/network/src/coordinator.rs
//! State machine for one resumable download
//!
//! The coordinator sees every request and response of a single download
//! through the [`ExchangeInterceptor`] hooks:
//!
//! - `Ready`: the first request is checked for headers that would make
//!   resumption impossible, and any caller-set `If-Match`/`Range` values are
//!   kept as hints.
//! - `Active`: the first response produced a marker. Later requests are
//!   stamped with the marker's `Range`/`If-Match`, later responses must match
//!   it exactly.
//! - `Cancelled`: terminal. Either the download was not resumable and the
//!   coordinator stepped aside, or it was aborted.

use crate::error::{NetworkError, NetworkResult};
use crate::interceptor::ExchangeInterceptor;
use crate::marker::ResumableDownloadMarker;
use crate::transport::{ObjectRequest, ObjectResponse, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, ETAG, IF_MATCH, RANGE};
use reqwest::{Method, StatusCode};
use stowage_core::HttpRange;

/// Externally visible coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Ready,
    Active,
    Cancelled,
}

/// Values the caller pre-set on the first request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerHints {
    pub etag: Option<String>,
    pub range: Option<HttpRange>,
}

#[derive(Debug)]
enum State {
    Ready,
    Active(ResumableDownloadMarker),
    Cancelled,
}

/// Single source of truth for one in-flight download
#[derive(Debug)]
pub struct ResumableDownloadCoordinator {
    state: State,
    hints: MarkerHints,
}

impl ResumableDownloadCoordinator {
    pub fn new() -> Self {
        Self {
            state: State::Ready,
            hints: MarkerHints::default(),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        match self.state {
            State::Ready => CoordinatorState::Ready,
            State::Active(_) => CoordinatorState::Active,
            State::Cancelled => CoordinatorState::Cancelled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    pub fn marker(&self) -> Option<&ResumableDownloadMarker> {
        match &self.state {
            State::Active(marker) => Some(marker),
            _ => None,
        }
    }

    pub fn hints(&self) -> &MarkerHints {
        &self.hints
    }

    /// Fatal failures are never answered with a continuation
    pub fn is_fatal(error: &TransportError) -> bool {
        error.kind().is_fatal()
    }

    /// Validates or stamps an outgoing request
    pub fn prepare_request(&mut self, request: &mut ObjectRequest) -> NetworkResult<()> {
        match &self.state {
            State::Ready => {
                self.hints = extract_hints(request)?;
                log::debug!(
                    "Resumable download of {} prepared (etag hint: {:?}, range hint: {:?})",
                    request.url(),
                    self.hints.etag,
                    self.hints.range.map(|r| r.render())
                );
                Ok(())
            }
            State::Active(marker) => stamp_marker(marker, request.headers_mut()),
            State::Cancelled => Ok(()),
        }
    }

    /// Builds the marker from the first response, or validates a
    /// continuation response against it
    pub fn accept_response(&mut self, response: &ObjectResponse) -> NetworkResult<()> {
        match &self.state {
            State::Ready => self.accept_first_response(response),
            State::Active(marker) => validate_continuation(marker, response),
            State::Cancelled => Ok(()),
        }
    }

    /// Moves the marker past the bytes delivered since the last (re)start
    pub fn advance(&mut self, bytes_delivered: u64) -> NetworkResult<()> {
        match &mut self.state {
            State::Active(marker) => Ok(marker.update_range_start(bytes_delivered)?),
            _ => Err(NetworkError::Cancelled),
        }
    }

    /// Releases the marker; the coordinator takes no further part in the
    /// download
    pub fn cancel(&mut self) -> NetworkResult<()> {
        if matches!(self.state, State::Cancelled) {
            return Err(NetworkError::AlreadyCancelled);
        }
        self.state = State::Cancelled;
        Ok(())
    }

    fn abandon(&mut self) {
        if !matches!(self.state, State::Cancelled) {
            log::debug!("Cancelling resumable download coordinator");
            self.state = State::Cancelled;
        }
    }

    fn step_aside(&mut self, reason: &str) {
        log::info!("Download is not resumable: {}", reason);
        self.state = State::Cancelled;
    }

    fn accept_first_response(&mut self, response: &ObjectResponse) -> NetworkResult<()> {
        let status = response.status();
        if !status.is_success() {
            self.step_aside(&format!("server returned HTTP {}", status));
            return Ok(());
        }

        if status == StatusCode::OK {
            if let Some(hint) = self.hints.range {
                return Err(NetworkError::UnexpectedResponse(format!(
                    "requested {} but server returned the whole object",
                    hint
                )));
            }
        }

        let headers = response.headers();

        let etag = match single_value(headers, &ETAG) {
            Some(etag) => etag.to_string(),
            None => {
                self.step_aside("response has no single non-blank ETag");
                return Ok(());
            }
        };

        let range = match response_range(status, headers)? {
            Some(range) => range,
            None => {
                self.step_aside("response has neither Content-Range nor Content-Length");
                return Ok(());
            }
        };

        if let Some(hint) = &self.hints.etag {
            if *hint != etag {
                return Err(NetworkError::UnexpectedResponse(format!(
                    "requested ETag {} but server sent {}",
                    hint, etag
                )));
            }
        }

        if let Some(hint) = self.hints.range {
            hint.validate_against(&range).map_err(|e| {
                NetworkError::UnexpectedResponse(format!(
                    "requested {} but server sent {} ({})",
                    hint, range, e
                ))
            })?;
        }

        let marker = ResumableDownloadMarker::new(etag, range)?;
        log::debug!(
            "Resumable download active: etag {}, range {}",
            marker.etag(),
            marker.target_range()
        );
        self.state = State::Active(marker);
        Ok(())
    }
}

impl Default for ResumableDownloadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeInterceptor for ResumableDownloadCoordinator {
    fn before_send(&mut self, request: &mut ObjectRequest) -> NetworkResult<()> {
        let result = self.prepare_request(request);
        if result.is_err() {
            self.abandon();
        }
        result
    }

    fn after_receive(&mut self, response: &ObjectResponse) -> NetworkResult<()> {
        let result = self.accept_response(response);
        if result.is_err() {
            self.abandon();
        }
        result
    }
}

fn extract_hints(request: &ObjectRequest) -> NetworkResult<MarkerHints> {
    if *request.method() != Method::GET {
        return Err(NetworkError::IncompatibleRequest(format!(
            "method {} cannot be resumed, only GET",
            request.method()
        )));
    }

    let headers = request.headers();

    let etag = match single_request_header(headers, &IF_MATCH)? {
        Some(value) if value.contains(',') => {
            return Err(NetworkError::IncompatibleRequest(format!(
                "If-Match lists several ETags: {}",
                value
            )))
        }
        Some(value) if value == "*" => {
            return Err(NetworkError::IncompatibleRequest(
                "If-Match: * does not identify a single object generation".to_string(),
            ))
        }
        Some(value) => Some(value.to_string()),
        None => None,
    };

    let range = single_request_header(headers, &RANGE)?
        .map(|value| {
            HttpRange::parse_request(value)
                .map_err(|e| NetworkError::IncompatibleRequest(format!("unsupported Range: {}", e)))
        })
        .transpose()?;

    Ok(MarkerHints { etag, range })
}

/// Reads a request header that may appear at most once
fn single_request_header<'a>(
    headers: &'a HeaderMap,
    name: &HeaderName,
) -> NetworkResult<Option<&'a str>> {
    let mut values = headers.get_all(name).iter();

    let first = match values.next() {
        Some(value) => value,
        None => return Ok(None),
    };

    if values.next().is_some() {
        return Err(NetworkError::IncompatibleRequest(format!(
            "multiple {} headers",
            name
        )));
    }

    let value = first.to_str().map_err(|_| {
        NetworkError::IncompatibleRequest(format!("{} header is not valid text", name))
    })?;

    Ok(Some(value.trim()))
}

/// Reads a response header that must appear exactly once with a non-blank
/// value
fn single_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let mut values = headers.get_all(name).iter();
    let first = values.next()?;
    if values.next().is_some() {
        return None;
    }
    first
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Range delivered by the first response
///
/// `Ok(None)` means the response does not carry enough information to
/// resume.
fn response_range(status: StatusCode, headers: &HeaderMap) -> NetworkResult<Option<HttpRange>> {
    if let Some(raw) = single_value(headers, &CONTENT_RANGE) {
        return parse_content_range(raw).map(Some);
    }

    if status == StatusCode::PARTIAL_CONTENT {
        return Err(NetworkError::UnexpectedResponse(
            "206 Partial Content without a Content-Range header".to_string(),
        ));
    }

    let length = single_value(headers, &CONTENT_LENGTH).and_then(|v| v.parse::<u64>().ok());
    Ok(length.and_then(|len| HttpRange::whole_object(len).ok()))
}

fn parse_content_range(raw: &str) -> NetworkResult<HttpRange> {
    HttpRange::parse_content_range(raw)
        .map_err(|e| NetworkError::UnexpectedResponse(format!("bad Content-Range: {}", e)))
}

fn stamp_marker(marker: &ResumableDownloadMarker, headers: &mut HeaderMap) -> NetworkResult<()> {
    let range = HeaderValue::from_str(&marker.range_header())
        .map_err(|e| NetworkError::Custom(format!("cannot encode Range header: {}", e)))?;
    let etag = HeaderValue::from_str(marker.etag())
        .map_err(|e| NetworkError::Custom(format!("cannot encode If-Match header: {}", e)))?;

    headers.insert(RANGE, range);
    headers.insert(IF_MATCH, etag);
    Ok(())
}

fn validate_continuation(
    marker: &ResumableDownloadMarker,
    response: &ObjectResponse,
) -> NetworkResult<()> {
    let status = response.status();
    if status != StatusCode::PARTIAL_CONTENT {
        return Err(NetworkError::UnexpectedResponse(format!(
            "continuation expected HTTP 206 Partial Content, got {}",
            status
        )));
    }

    let headers = response.headers();

    let etag = single_value(headers, &ETAG).ok_or_else(|| {
        NetworkError::UnexpectedResponse("continuation response has no ETag".to_string())
    })?;
    if etag != marker.etag() {
        return Err(NetworkError::UnexpectedResponse(format!(
            "object changed during download: ETag was {}, now {}",
            marker.etag(),
            etag
        )));
    }

    let raw = single_value(headers, &CONTENT_RANGE).ok_or_else(|| {
        NetworkError::UnexpectedResponse(
            "continuation response has no Content-Range".to_string(),
        )
    })?;
    let range = parse_content_range(raw)?;

    marker.validate_response_range(&range)
}
