// crates/network/src/transport.rs
//! Transport abstraction consumed by the download machinery
//!
//! Anything that can execute a request and hand back status, headers and a
//! lazily read body can carry a resumable download. [`crate::Client`] is the
//! reqwest-backed implementation; tests use scripted in-memory transports.

use crate::error::{NetworkError, NetworkResult};
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use stowage_resilience::{classify_error_chain, classify_io_error, FailureKind};
use thiserror::Error;

/// Lazily read response body
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Executes HTTP requests
///
/// Implementations must honor [`RequestContext::retries_disabled`]: when it
/// is set the request is attempted exactly once, because the caller owns the
/// retry decision for that exchange.
pub trait HttpTransport: Send + Sync {
    fn execute(
        &self,
        request: ObjectRequest,
        context: RequestContext,
    ) -> impl Future<Output = Result<ObjectResponse, TransportError>> + Send;
}

/// Per-request flags passed to the transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    retries_disabled: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that turns off the transport's own retries
    pub fn without_retries() -> Self {
        Self {
            retries_disabled: true,
        }
    }

    pub fn retries_disabled(&self) -> bool {
        self.retries_disabled
    }
}

/// An outgoing request
#[derive(Debug, Clone)]
pub struct ObjectRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl ObjectRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Builds a GET request for `url`
    pub fn get(url: &str) -> NetworkResult<Self> {
        let url = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self::new(Method::GET, url))
    }

    /// Appends a header value, keeping any existing values for the name
    pub fn with_header(mut self, name: HeaderName, value: &str) -> NetworkResult<Self> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            NetworkError::IncompatibleRequest(format!("invalid {} header value {:?}", name, value))
        })?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

/// A response whose body has not been read yet
pub struct ObjectResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyStream,
}

impl ObjectResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_body(self) -> BodyStream {
        self.body
    }
}

impl fmt::Debug for ObjectResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// A failure while sending a request or reading a body
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: FailureKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        let kind = classify_io_error(&e);
        Self::new(kind, e.to_string()).with_source(e)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = e.to_string();
        // classification never looks at the URL
        let e = e.without_url();
        let kind = if e.is_timeout() {
            FailureKind::Interrupted
        } else {
            classify_error_chain(&e)
        };
        Self::new(kind, message).with_source(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::RANGE;

    #[test]
    fn test_get_request() {
        let request = ObjectRequest::get("https://objects.example.com/bucket/key").unwrap();
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(request.url().path(), "/bucket/key");
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let err = ObjectRequest::get("not a url").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidUrl(_)));
    }

    #[test]
    fn test_with_header_appends() {
        let request = ObjectRequest::get("https://objects.example.com/key")
            .unwrap()
            .with_header(RANGE, "bytes=0-9")
            .unwrap()
            .with_header(RANGE, "bytes=10-19")
            .unwrap();
        assert_eq!(request.headers().get_all(RANGE).iter().count(), 2);
    }

    #[test]
    fn test_context_flags() {
        assert!(!RequestContext::new().retries_disabled());
        assert!(RequestContext::without_retries().retries_disabled());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: TransportError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer").into();
        assert_eq!(err.kind(), FailureKind::Other);
        assert!(!err.is_fatal());

        let err: TransportError =
            std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out").into();
        assert!(err.is_fatal());
    }
}
