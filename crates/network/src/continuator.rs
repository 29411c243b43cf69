// crates/network/src/continuator.rs
//! Issues continuation requests for an interrupted body

use crate::coordinator::ResumableDownloadCoordinator;
use crate::error::{NetworkError, NetworkResult};
use crate::interceptor::execute_intercepted;
use crate::marker::ResumableDownloadMarker;
use crate::transport::{BodyStream, HttpTransport, ObjectRequest, RequestContext, TransportError};
use std::sync::Arc;

/// Turns recoverable read failures into follow-up range requests
///
/// Owns the coordinator of an active download, so the two cannot be bound
/// to different downloads.
pub struct Continuator<T: HttpTransport> {
    transport: Arc<T>,
    request: ObjectRequest,
    coordinator: ResumableDownloadCoordinator,
    continuations: u32,
    max_continuations: Option<u32>,
    finished: bool,
}

impl<T: HttpTransport> Continuator<T> {
    /// `request` is the original request; every continuation is a copy of
    /// it stamped by the coordinator
    pub fn new(
        transport: Arc<T>,
        request: ObjectRequest,
        coordinator: ResumableDownloadCoordinator,
        max_continuations: Option<u32>,
    ) -> Self {
        Self {
            transport,
            request,
            coordinator,
            continuations: 0,
            max_continuations,
            finished: false,
        }
    }

    /// Continuations issued so far
    pub fn continuations(&self) -> u32 {
        self.continuations
    }

    pub fn max_continuations(&self) -> Option<u32> {
        self.max_continuations
    }

    pub fn coordinator(&self) -> &ResumableDownloadCoordinator {
        &self.coordinator
    }

    pub fn marker(&self) -> Option<&ResumableDownloadMarker> {
        self.coordinator.marker()
    }

    /// Requests the rest of the object after a read failure
    ///
    /// `bytes_delivered` counts the bytes the failed stream produced since
    /// the previous (re)start. On success the returned stream continues
    /// exactly where the failed one stopped.
    pub async fn build_continuation(
        &mut self,
        error: TransportError,
        bytes_delivered: u64,
    ) -> NetworkResult<BodyStream> {
        if ResumableDownloadCoordinator::is_fatal(&error) {
            log::warn!("Not resuming after fatal {}", error);
            self.abandon();
            return Err(NetworkError::Transport(error));
        }

        self.continuations += 1;
        let attempt = self.continuations;

        if let Some(max) = self.max_continuations {
            if attempt > max {
                log::warn!("Giving up after {} continuations: {}", max, error);
                self.abandon();
                return Err(NetworkError::MaxContinuationsReached { max, source: error });
            }
        }

        if let Err(e) = self.coordinator.advance(bytes_delivered) {
            self.abandon();
            return Err(match e {
                NetworkError::Range(source) => NetworkError::ContinuationFailed { attempt, source },
                other => other,
            });
        }

        log::info!(
            "Resuming {} after {} (continuation {}, {})",
            self.request.url(),
            error,
            attempt,
            self.coordinator
                .marker()
                .map(|m| m.range_header())
                .unwrap_or_default()
        );

        let result = execute_intercepted(
            self.transport.as_ref(),
            self.request.clone(),
            RequestContext::without_retries(),
            &mut self.coordinator,
        )
        .await;

        match result {
            Ok(response) => Ok(response.into_body()),
            Err(NetworkError::Transport(source)) => {
                self.abandon();
                Err(NetworkError::ContinuationRequestFailed { attempt, source })
            }
            Err(e) => Err(e),
        }
    }

    /// Ends the download and releases the coordinator
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        log::debug!(
            "Download of {} used {} continuation(s)",
            self.request.url(),
            self.continuations
        );
        self.abandon();
    }

    fn abandon(&mut self) {
        // Already cancelled is fine here
        let _ = self.coordinator.cancel();
    }
}

impl<T: HttpTransport> Drop for Continuator<T> {
    fn drop(&mut self) {
        self.finish();
    }
}
