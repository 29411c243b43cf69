// crates/network/src/report.rs
//! Summary of a finished download

use crate::error::{NetworkError, NetworkResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use stowage_core::HttpRange;

/// Called once when a body is fully read, fails, or is dropped
pub type ReportCallback = Arc<dyn Fn(&DownloadReport) + Send + Sync>;

/// How a download went
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub url: String,
    /// ETag of the object generation that was read, if resumable
    pub etag: Option<String>,
    /// Range negotiated by the first response, if resumable
    pub target_range: Option<HttpRange>,
    pub bytes_read: u64,
    pub continuations: u32,
    /// False when the body ended early or with an error
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DownloadReport {
    pub fn resumable(&self) -> bool {
        self.etag.is_some()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn to_json(&self) -> NetworkResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| NetworkError::Custom(e.to_string()))
    }
}
