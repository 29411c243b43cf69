// crates/network/src/download.rs
//! Download manager

use crate::body::ResumableBody;
use crate::client::Client;
use crate::continuator::Continuator;
use crate::coordinator::ResumableDownloadCoordinator;
use crate::error::{NetworkError, NetworkResult};
use crate::interceptor::execute_intercepted;
use crate::report::{DownloadReport, ReportCallback};
use crate::transport::{HttpTransport, ObjectRequest, ObjectResponse, RequestContext};
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufWriter;

/// Download behaviour
#[derive(Clone)]
pub struct DownloadOptions {
    /// Resume interrupted bodies with range requests
    pub resumable: bool,
    /// Continuations allowed per download, unlimited when `None`
    pub max_continuations: Option<u32>,
    /// Write buffer used by `download_file`
    pub buffer_size: usize,
    /// Receives a report when each body is finished
    pub report_callback: Option<ReportCallback>,
}

impl DownloadOptions {
    pub fn with_resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    pub fn with_max_continuations(mut self, max: Option<u32>) -> Self {
        self.max_continuations = max;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_report_callback(mut self, callback: ReportCallback) -> Self {
        self.report_callback = Some(callback);
        self
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            resumable: true,
            max_continuations: None,
            buffer_size: 64 * 1024,
            report_callback: None,
        }
    }
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("resumable", &self.resumable)
            .field("max_continuations", &self.max_continuations)
            .field("buffer_size", &self.buffer_size)
            .field("report_callback", &self.report_callback.is_some())
            .finish()
    }
}

/// Download manager
pub struct DownloadManager<T: HttpTransport = Client> {
    transport: Arc<T>,
    options: DownloadOptions,
}

impl<T: HttpTransport> DownloadManager<T> {
    /// Creates a new download manager
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, DownloadOptions::default())
    }

    pub fn with_options(transport: T, options: DownloadOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            options,
        }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Sends `request` and returns its body
    ///
    /// The body is resumable when resumption is enabled and the first
    /// response carries an ETag and range information. Otherwise it is read
    /// as is.
    pub async fn open(&self, request: ObjectRequest) -> NetworkResult<ResumableBody<T>> {
        let url = request.url().to_string();

        if !self.options.resumable {
            let response =
                execute_intercepted(self.transport.as_ref(), request, RequestContext::new(), &mut ())
                    .await?;
            check_status(&response, &url)?;
            return Ok(self.plain_body(url, response));
        }

        let template = request.clone();
        let mut coordinator = ResumableDownloadCoordinator::new();
        let response = execute_intercepted(
            self.transport.as_ref(),
            request,
            RequestContext::new(),
            &mut coordinator,
        )
        .await?;
        check_status(&response, &url)?;

        if !coordinator.is_active() {
            return Ok(self.plain_body(url, response));
        }

        let continuator = Continuator::new(
            self.transport.clone(),
            template,
            coordinator,
            self.options.max_continuations,
        );
        Ok(
            ResumableBody::resumable(url, response.into_body(), continuator)
                .with_report_callback(self.options.report_callback.clone()),
        )
    }

    /// Opens a plain GET of `url`
    pub async fn open_url(&self, url: &str) -> NetworkResult<ResumableBody<T>> {
        self.open(ObjectRequest::get(url)?).await
    }

    /// Downloads the body of `request` to `destination`
    pub async fn download_file(
        &self,
        request: ObjectRequest,
        destination: impl AsRef<Path>,
    ) -> NetworkResult<DownloadReport> {
        let mut body = self.open(request).await?;

        let file = File::create(destination.as_ref()).await?;
        let mut writer = BufWriter::with_capacity(self.options.buffer_size, file);
        let written = body.copy_to(&mut writer).await?;

        log::info!(
            "Downloaded {} bytes to {}",
            written,
            destination.as_ref().display()
        );
        Ok(body.close())
    }

    /// Downloads content to memory
    pub async fn download_bytes(&self, request: ObjectRequest) -> NetworkResult<Bytes> {
        self.open(request).await?.bytes().await
    }

    /// Downloads content as a string
    pub async fn download_string(&self, request: ObjectRequest) -> NetworkResult<String> {
        let bytes = self.download_bytes(request).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| NetworkError::Custom(format!("Invalid UTF-8: {}", e)))
    }

    fn plain_body(&self, url: String, response: ObjectResponse) -> ResumableBody<T> {
        ResumableBody::plain(url, response.into_body())
            .with_report_callback(self.options.report_callback.clone())
    }
}

fn check_status(response: &ObjectResponse, url: &str) -> NetworkResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(NetworkError::Status {
            status: response.status(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use futures::{stream, StreamExt};
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, ETAG};
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StaticTransport {
        status: StatusCode,
        etag: Option<&'static str>,
        body: &'static [u8],
        calls: Mutex<usize>,
    }

    impl StaticTransport {
        fn new(status: StatusCode, etag: Option<&'static str>, body: &'static [u8]) -> Self {
            Self {
                status,
                etag,
                body,
                calls: Mutex::new(0),
            }
        }
    }

    impl HttpTransport for StaticTransport {
        async fn execute(
            &self,
            _request: ObjectRequest,
            _context: RequestContext,
        ) -> Result<ObjectResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            let mut headers = HeaderMap::new();
            if let Some(etag) = self.etag {
                headers.insert(ETAG, HeaderValue::from_static(etag));
            }
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
            let body = stream::iter(vec![Ok(Bytes::from_static(self.body))]).boxed();
            Ok(ObjectResponse::new(self.status, headers, body))
        }
    }

    fn request() -> ObjectRequest {
        ObjectRequest::get("https://objects.example.com/key").unwrap()
    }

    #[test]
    fn test_default_options() {
        let options = DownloadOptions::default();
        assert!(options.resumable);
        assert_eq!(options.max_continuations, None);
        assert_eq!(options.buffer_size, 64 * 1024);
        assert_eq!(DownloadOptions::default().with_buffer_size(0).buffer_size, 1);
    }

    #[tokio::test]
    async fn test_open_resumable() {
        let manager = DownloadManager::new(StaticTransport::new(StatusCode::OK, Some("\"v1\""), b"hello"));
        let body = manager.open(request()).await.unwrap();

        assert!(body.is_resumable());
        assert_eq!(body.marker().unwrap().etag(), "\"v1\"");
        assert_eq!(body.bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_open_without_etag_is_plain() {
        let manager = DownloadManager::new(StaticTransport::new(StatusCode::OK, None, b"hello"));
        let body = manager.open(request()).await.unwrap();
        assert!(!body.is_resumable());
    }

    #[tokio::test]
    async fn test_resumption_disabled() {
        let options = DownloadOptions::default().with_resumable(false);
        let manager = DownloadManager::with_options(
            StaticTransport::new(StatusCode::OK, Some("\"v1\""), b"hello"),
            options,
        );
        let body = manager.open(request()).await.unwrap();
        assert!(!body.is_resumable());
    }

    #[tokio::test]
    async fn test_error_status() {
        let manager = DownloadManager::new(StaticTransport::new(StatusCode::NOT_FOUND, None, b""));
        let err = manager.open(request()).await.err().unwrap();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_download_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("object.bin");

        let manager = DownloadManager::new(StaticTransport::new(StatusCode::OK, Some("\"v1\""), b"file body"));
        let report = manager.download_file(request(), &path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"file body");
        assert_eq!(report.bytes_read, 9);
        assert!(report.completed);
        assert_eq!(report.etag.as_deref(), Some("\"v1\""));
        assert_eq!(*manager.transport.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_download_string() {
        let manager = DownloadManager::new(StaticTransport::new(StatusCode::OK, None, b"text"));
        assert_eq!(manager.download_string(request()).await.unwrap(), "text");
    }
}
