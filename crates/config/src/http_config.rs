//! HTTP client configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Settings for the underlying HTTP client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds, 0 disables it
    ///
    /// A timeout that fires mid-body is not resumed, so large downloads
    /// usually want this off.
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// User agent sent with every request; empty uses the built-in one
    pub user_agent: String,

    /// Maximum redirects to follow
    pub max_redirects: usize,

    /// Attempts per ordinary request, including the first
    pub retry_attempts: usize,

    /// Delay before the first retry in milliseconds
    pub retry_initial_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            connect_timeout_secs: 10,
            user_agent: String::new(),
            max_redirects: 10,
            retry_attempts: 3,
            retry_initial_delay_ms: 100,
        }
    }
}

impl ConfigSection for HttpConfig {
    const NAME: &'static str = "http";
    const FIELDS: &'static [&'static str] = &[
        "timeout_secs",
        "connect_timeout_secs",
        "user_agent",
        "max_redirects",
        "retry_attempts",
        "retry_initial_delay_ms",
    ];

    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.timeout_secs, 0, 86_400, "http.timeout_secs"),
            Validator::in_range(self.connect_timeout_secs, 1, 300, "http.connect_timeout_secs"),
            Validator::header_value(&self.user_agent, "http.user_agent"),
            Validator::in_range(self.max_redirects, 0, 50, "http.max_redirects"),
            Validator::in_range(self.retry_attempts, 1, 10, "http.retry_attempts"),
            Validator::in_range(
                self.retry_initial_delay_ms,
                0,
                60_000,
                "http.retry_initial_delay_ms",
            ),
        ])
    }

    fn set(&mut self, field: &str, value: &str) -> Result<bool, ValidationError> {
        let path = format!("http.{}", field);
        match field {
            "timeout_secs" => self.timeout_secs = Validator::parse(value, &path)?,
            "connect_timeout_secs" => self.connect_timeout_secs = Validator::parse(value, &path)?,
            "user_agent" => self.user_agent = value.to_string(),
            "max_redirects" => self.max_redirects = Validator::parse(value, &path)?,
            "retry_attempts" => self.retry_attempts = Validator::parse(value, &path)?,
            "retry_initial_delay_ms" => {
                self.retry_initial_delay_ms = Validator::parse(value, &path)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}
