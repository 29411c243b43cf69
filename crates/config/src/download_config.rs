//! Download configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// How downloads are read and resumed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DownloadConfig {
    /// Resume interrupted downloads with range requests
    pub resumable: bool,

    /// Continuations allowed per download; absent means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_continuations: Option<u32>,

    /// Write buffer size in bytes
    pub buffer_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            resumable: true,
            max_continuations: None,
            buffer_size: 64 * 1024,
        }
    }
}

impl ConfigSection for DownloadConfig {
    const NAME: &'static str = "download";
    const FIELDS: &'static [&'static str] = &["resumable", "max_continuations", "buffer_size"];

    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::in_range(
            self.buffer_size,
            512,
            16 * 1024 * 1024,
            "download.buffer_size",
        )];

        if let Some(max) = self.max_continuations {
            results.push(Validator::in_range(max, 1, 10_000, "download.max_continuations"));
        }

        Validator::collect_errors(results)
    }

    fn set(&mut self, field: &str, value: &str) -> Result<bool, ValidationError> {
        let path = format!("download.{}", field);
        match field {
            "resumable" => self.resumable = Validator::parse(value, &path)?,
            "max_continuations" => {
                self.max_continuations = match value.trim() {
                    "" | "unlimited" => None,
                    limit => Some(Validator::parse(limit, &path)?),
                }
            }
            "buffer_size" => self.buffer_size = Validator::parse(value, &path)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}
