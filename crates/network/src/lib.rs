// crates/network/src/lib.rs
//! Resumable HTTP object downloads
//!
//! A download opened through [`DownloadManager`] is watched by a
//! [`ResumableDownloadCoordinator`]. When the first response identifies the
//! object (an `ETag`) and its byte range, a connection dropped mid-body is
//! answered with a `Range`/`If-Match` request for exactly the missing bytes,
//! and the reader sees one contiguous body.
//!
//! ```no_run
//! use stowage_network::{Client, DownloadManager, ObjectRequest};
//!
//! # async fn run() -> stowage_network::NetworkResult<()> {
//! let manager = DownloadManager::new(Client::new()?);
//! let request = ObjectRequest::get("https://objects.example.com/bucket/large.bin")?;
//! let report = manager.download_file(request, "large.bin").await?;
//! println!("{} bytes, {} continuations", report.bytes_read, report.continuations);
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
mod continuator;
mod coordinator;
mod download;
mod error;
mod interceptor;
mod marker;
mod report;
mod transport;

pub use body::ResumableBody;
pub use client::{Client, ClientConfig};
pub use continuator::Continuator;
pub use coordinator::{CoordinatorState, MarkerHints, ResumableDownloadCoordinator};
pub use download::{DownloadManager, DownloadOptions};
pub use error::{NetworkError, NetworkResult};
pub use interceptor::{execute_intercepted, ExchangeInterceptor};
pub use marker::ResumableDownloadMarker;
pub use report::{DownloadReport, ReportCallback};
pub use transport::{
    BodyStream, HttpTransport, ObjectRequest, ObjectResponse, RequestContext, TransportError,
};

pub use stowage_core::{HttpRange, RangeKind};
pub use stowage_resilience::FailureKind;
