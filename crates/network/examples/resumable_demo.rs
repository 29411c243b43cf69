// crates/network/examples/resumable_demo.rs
//! Resumable download demonstration
//!
//! Serves an object from memory through a transport that drops the
//! connection every few kilobytes, and shows the download finishing anyway.
//!
//! Run with `RUST_LOG=debug` to see each continuation.

use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, ETAG, RANGE};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use stowage_network::{
    DownloadManager, DownloadOptions, FailureKind, HttpRange, HttpTransport, ObjectRequest,
    ObjectResponse, RequestContext, TransportError,
};

/// Drops every response after `cut` bytes
struct FlakyTransport {
    object: Bytes,
    cut: usize,
    requests: AtomicUsize,
}

impl HttpTransport for FlakyTransport {
    async fn execute(
        &self,
        request: ObjectRequest,
        _context: RequestContext,
    ) -> Result<ObjectResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let size = self.object.len() as u64;
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"demo-1\""));

        let range = request
            .headers()
            .get(RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| HttpRange::parse_request(v).ok());

        let (status, body) = match range {
            Some(r) => {
                let value = format!("bytes {}-{}/{}", r.start(), r.end(), size);
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(CONTENT_RANGE, value);
                }
                let slice = self.object.slice(r.start() as usize..=r.end() as usize);
                (StatusCode::PARTIAL_CONTENT, slice)
            }
            None => (StatusCode::OK, self.object.clone()),
        };
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        let sent = body.slice(..self.cut.min(body.len()));
        let mut chunks = vec![Ok(sent)];
        if body.len() > self.cut {
            chunks.push(Err(TransportError::new(
                FailureKind::Other,
                "connection reset by peer",
            )));
        }

        Ok(ObjectResponse::new(status, headers, stream::iter(chunks).boxed()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Stowage Resumable Download Demo");
    println!("===============================\n");

    let object: Vec<u8> = (0..64 * 1024).map(|i| (i % 256) as u8).collect();
    let transport = FlakyTransport {
        object: Bytes::from(object.clone()),
        cut: 10 * 1024,
        requests: AtomicUsize::new(0),
    };

    let options = DownloadOptions::default().with_max_continuations(Some(16));
    let manager = DownloadManager::with_options(transport, options);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("object.bin");
    let request = ObjectRequest::get("https://objects.example.com/demo/object.bin")?;

    let report = manager.download_file(request, &path).await?;
    let written = tokio::fs::read(&path).await?;

    println!("Bytes read:      {}", report.bytes_read);
    println!("Continuations:   {}", report.continuations);
    println!("Contents intact: {}", written == object);
    println!("\nReport:\n{}", report.to_json()?);

    Ok(())
}
