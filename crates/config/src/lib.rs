//! Stowage configuration system
//!
//! Settings live in a TOML file under the platform config directory. Each
//! section implements [`ConfigSection`], so it validates itself and accepts
//! `section.field = value` assignments from the CLI and the environment.
//!
//! # Architecture
//!
//! - **Trait-based**: each section is a type implementing `ConfigSection`
//! - **Lenient loading**: out-of-range values load with a warning; unreadable files are errors
//! - **Atomic writes**: config files are never left half written
//! - **Environment overrides**: `STOWAGE_<SECTION>_<FIELD>` beats the file
//! - **Backups**: the previous file is kept as `config.toml.bak`
//!
//! # Example
//!
//! ```rust
//! use stowage_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Resumable downloads: {}", config.download.resumable);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
mod download_config;
mod http_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, Validator};

pub use download_config::DownloadConfig;
pub use http_config::HttpConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Download behaviour
    pub download: DownloadConfig,
}

impl Config {
    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.http.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.download.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Assigns a setting by its dotted key, e.g. `download.buffer_size`
    ///
    /// The value is parsed but not range checked; call [`Config::validate`]
    /// before using or saving the result.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let known = match section {
            s if s == HttpConfig::NAME => self.http.set(field, value),
            s if s == DownloadConfig::NAME => self.download.set(field, value),
            _ => Ok(false),
        }
        .map_err(|e| ConfigError::Invalid(vec![e]))?;

        if known {
            Ok(())
        } else {
            Err(ConfigError::UnknownKey(key.to_string()))
        }
    }

    /// Every key accepted by [`Config::set`]
    pub fn keys() -> impl Iterator<Item = String> {
        let http = HttpConfig::FIELDS
            .iter()
            .map(|field| format!("{}.{}", HttpConfig::NAME, field));
        let download = DownloadConfig::FIELDS
            .iter()
            .map(|field| format!("{}.{}", DownloadConfig::NAME, field));
        http.chain(download)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            http: HttpConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_set_by_key() {
        let mut config = Config::default();
        config.set("download.max_continuations", "3").unwrap();
        config.set("http.timeout_secs", "600").unwrap();

        assert_eq!(config.download.max_continuations, Some(3));
        assert_eq!(config.http.timeout_secs, 600);
    }

    #[test]
    fn test_set_rejects_unknown_and_unparsable() {
        let mut config = Config::default();
        assert!(matches!(config.set("download", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(config.set("player.volume", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(config.set("http.colour", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            config.set("http.max_redirects", "-1"),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_keys_are_settable() {
        let keys: Vec<String> = Config::keys().collect();
        assert_eq!(keys.len(), 9);
        assert!(keys.contains(&"download.max_continuations".to_string()));
    }

    #[test]
    fn test_errors_collected_across_sections() {
        let mut config = Config::default();
        config.http.retry_attempts = 0;
        config.download.buffer_size = 1;

        assert_eq!(config.validate().unwrap_err().len(), 2);
    }
}
