// crates/network/src/body.rs
//! Response body that survives connection hiccups

use crate::continuator::Continuator;
use crate::error::{NetworkError, NetworkResult};
use crate::marker::ResumableDownloadMarker;
use crate::report::{DownloadReport, ReportCallback};
use crate::transport::{BodyStream, HttpTransport, TransportError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use stowage_resilience::FailureKind;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Finished,
    Failed,
}

/// Body of a download, read chunk by chunk
///
/// In resumable mode recoverable read failures are answered with a
/// continuation request and the read carries on from the first missing
/// byte. In plain mode the body behaves like the underlying stream.
pub struct ResumableBody<T: HttpTransport> {
    url: String,
    stream: Option<BodyStream>,
    continuator: Option<Continuator<T>>,
    /// Bytes produced by the current stream
    delivered_since_start: u64,
    bytes_read: u64,
    continued: bool,
    phase: Phase,
    report_callback: Option<ReportCallback>,
    started_at: DateTime<Utc>,
    final_report: Option<DownloadReport>,
}

impl<T: HttpTransport> ResumableBody<T> {
    pub(crate) fn plain(url: String, stream: BodyStream) -> Self {
        Self::build(url, stream, None)
    }

    pub(crate) fn resumable(url: String, stream: BodyStream, continuator: Continuator<T>) -> Self {
        Self::build(url, stream, Some(continuator))
    }

    fn build(url: String, stream: BodyStream, continuator: Option<Continuator<T>>) -> Self {
        Self {
            url,
            stream: Some(stream),
            continuator,
            delivered_since_start: 0,
            bytes_read: 0,
            continued: false,
            phase: Phase::Streaming,
            report_callback: None,
            started_at: Utc::now(),
            final_report: None,
        }
    }

    pub(crate) fn with_report_callback(mut self, callback: Option<ReportCallback>) -> Self {
        self.report_callback = callback;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Bytes handed to the reader so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn is_resumable(&self) -> bool {
        self.continuator.is_some()
    }

    /// Continuations issued so far
    pub fn continuations(&self) -> u32 {
        self.continuator.as_ref().map_or(0, |c| c.continuations())
    }

    pub fn marker(&self) -> Option<&ResumableDownloadMarker> {
        self.continuator.as_ref().and_then(|c| c.marker())
    }

    /// Reads the next chunk, or `None` once the body is complete
    pub async fn next_chunk(&mut self) -> NetworkResult<Option<Bytes>> {
        match self.phase {
            Phase::Finished => return Ok(None),
            Phase::Failed => return Err(NetworkError::Cancelled),
            Phase::Streaming => {}
        }

        loop {
            let stream = match self.stream.as_mut() {
                Some(stream) => stream,
                None => return Err(self.fail(NetworkError::Cancelled)),
            };

            let failure = match stream.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => {
                    if let Err(e) = self.check_overrun(chunk.len() as u64) {
                        return Err(self.fail(e));
                    }
                    self.delivered_since_start += chunk.len() as u64;
                    self.bytes_read += chunk.len() as u64;
                    return Ok(Some(chunk));
                }
                Some(Err(e)) if self.range_exhausted() => {
                    log::debug!(
                        "Ignoring read error after the last byte of {}: {}",
                        self.url,
                        e
                    );
                    self.complete();
                    return Ok(None);
                }
                Some(Err(e)) => e,
                None => match self.premature_end() {
                    Ok(None) => {
                        self.complete();
                        return Ok(None);
                    }
                    Ok(Some(failure)) => failure,
                    Err(e) => return Err(self.fail(e)),
                },
            };

            let continuator = match self.continuator.as_mut() {
                Some(continuator) => continuator,
                None => return Err(self.fail(NetworkError::Transport(failure))),
            };

            self.stream = None;
            match continuator
                .build_continuation(failure, self.delivered_since_start)
                .await
            {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.delivered_since_start = 0;
                    self.continued = true;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Turns the body into a stream of chunks
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> BoxStream<'static, NetworkResult<Bytes>>
    where
        T: 'static,
    {
        stream::unfold(Some(self), |body| async move {
            let mut body = body?;
            match body.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    /// Copies the whole body into `writer`, returning the byte count
    pub async fn copy_to<W>(&mut self, writer: &mut W) -> NetworkResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.next_chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Reads the remainder into memory
    pub async fn bytes(mut self) -> NetworkResult<Bytes> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }

    /// Stops reading and releases the download
    pub fn close(mut self) -> DownloadReport {
        if self.phase == Phase::Streaming {
            log::debug!("Closing {} after {} bytes", self.url, self.bytes_read);
        }
        self.stream = None;
        self.finish();
        self.final_report.clone().unwrap_or_else(|| self.report())
    }

    /// Builds a report of the download so far
    pub fn report(&self) -> DownloadReport {
        if let Some(report) = &self.final_report {
            return report.clone();
        }

        let marker = self.marker();
        let target_range = marker.map(|m| *m.target_range());

        DownloadReport {
            url: self.url.clone(),
            etag: marker.map(|m| m.etag().to_string()),
            target_range,
            bytes_read: self.bytes_read,
            continuations: self.continuations(),
            completed: self.phase == Phase::Finished,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    /// Rejects bytes beyond the end of the current range
    fn check_overrun(&self, len: u64) -> NetworkResult<()> {
        let remaining = match self.marker() {
            Some(marker) => marker.remaining(),
            None => return Ok(()),
        };

        if self.delivered_since_start + len > remaining {
            return Err(NetworkError::UnexpectedResponse(format!(
                "server sent more than the {} bytes left in the range",
                remaining
            )));
        }
        Ok(())
    }

    /// True once the current stream has delivered the whole range
    fn range_exhausted(&self) -> bool {
        self.marker()
            .is_some_and(|marker| self.delivered_since_start == marker.remaining())
    }

    /// Decides what an end of stream means
    ///
    /// `Ok(None)` is a complete body, `Ok(Some(_))` a recoverable early end.
    fn premature_end(&self) -> NetworkResult<Option<TransportError>> {
        let remaining = match self.marker() {
            Some(marker) => marker.remaining(),
            None => return Ok(None),
        };

        if self.delivered_since_start >= remaining {
            return Ok(None);
        }

        if self.continued && self.delivered_since_start == 0 {
            return Err(NetworkError::UnexpectedResponse(
                "continuation ended without delivering any bytes".to_string(),
            ));
        }

        Ok(Some(TransportError::new(
            FailureKind::Other,
            format!(
                "body ended after {} of {} bytes",
                self.delivered_since_start, remaining
            ),
        )))
    }

    fn complete(&mut self) {
        self.phase = Phase::Finished;
        self.stream = None;
        log::debug!("Finished reading {} ({} bytes)", self.url, self.bytes_read);
        self.finish();
    }

    fn fail(&mut self, error: NetworkError) -> NetworkError {
        log::warn!("Download of {} failed: {}", self.url, error);
        self.phase = Phase::Failed;
        self.stream = None;
        self.finish();
        error
    }

    /// Emits the report once and releases the coordinator
    fn finish(&mut self) {
        if self.final_report.is_some() {
            return;
        }

        let report = self.report();
        if let Some(callback) = &self.report_callback {
            callback(&report);
        }
        if let Some(continuator) = self.continuator.as_mut() {
            continuator.finish();
        }
        self.final_report = Some(report);
    }
}

impl<T: HttpTransport> Drop for ResumableBody<T> {
    fn drop(&mut self) {
        self.finish();
    }
}
