//! Reading and writing the config file
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the old file, so readers never see a half-written config. The
//! previous contents are kept next to it as `config.toml.bak`.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DEFAULT_HEADER: &str = "\
# Stowage configuration
#
# [http]
#   timeout_secs = 0 disables the whole-request timeout. A timeout that fires
#   mid-body ends the download, it is never resumed.
#
# [download]
#   max_continuations: add it to cap the resumptions per download.
#
# Every value can be overridden with STOWAGE_<SECTION>_<FIELD>,
# e.g. STOWAGE_DOWNLOAD_RESUMABLE=false, or changed with
# `stowage config set download.resumable false`.
";

pub(crate) struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn backup_path(&self) -> PathBuf {
        self.path.with_extension("toml.bak")
    }

    /// Reads the file, `None` when it does not exist
    ///
    /// Out-of-range values are logged, not rejected, so a broken file can
    /// still be inspected and fixed.
    pub(crate) fn read(&self) -> ConfigResult<Option<Config>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.path.clone(),
            });
        }

        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "{} has format version {}, reading it as version {}",
                self.path.display(),
                config.version,
                CONFIG_VERSION
            );
            config.version = CONFIG_VERSION;
        }

        if let Err(errors) = config.validate() {
            for error in &errors {
                log::warn!("{}: {}", self.path.display(), error);
            }
        }

        Ok(Some(config))
    }

    /// Validates `config` and replaces the file with it
    pub(crate) fn write(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;
        self.replace(&toml::to_string_pretty(config)?)
    }

    /// Writes the defaults preceded by an explanatory comment
    pub(crate) fn write_default(&self) -> ConfigResult<()> {
        let body = toml::to_string_pretty(&Config::default())?;
        self.replace(&format!("{}\n{}", DEFAULT_HEADER, body))
    }

    fn replace(&self, contents: &str) -> ConfigResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| self.write_error(dir, source))?;

        if self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup).map_err(|source| self.write_error(&backup, source))?;
            log::debug!("Kept previous config as {}", backup.display());
        }

        let mut temp = NamedTempFile::new_in(dir).map_err(|source| self.write_error(dir, source))?;
        temp.write_all(contents.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|source| self.write_error(temp.path(), source))?;
        temp.persist(&self.path)
            .map_err(|e| self.write_error(&self.path, e.error))?;

        log::info!("Wrote {}", self.path.display());
        Ok(())
    }

    fn write_error(&self, path: &Path, source: std::io::Error) -> ConfigError {
        ConfigError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_file() -> (TempDir, ConfigFile) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let file = ConfigFile::new(dir.path().join("config.toml"));
        (dir, file)
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let (_dir, file) = config_file();
        assert!(file.read().expect("Should read").is_none());
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, file) = config_file();

        let mut config = Config::default();
        config.download.max_continuations = Some(12);
        file.write(&config).expect("Should write");

        let loaded = file.read().expect("Should read").expect("File should exist");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let file = ConfigFile::new(dir.path().join("nested").join("config.toml"));

        file.write(&Config::default()).expect("Should write");
        assert!(file.path().exists());
    }

    #[test]
    fn test_rewrite_keeps_backup() {
        let (_dir, file) = config_file();

        file.write(&Config::default()).expect("Should write");
        assert!(!file.backup_path().exists());

        let mut config = Config::default();
        config.download.resumable = false;
        file.write(&config).expect("Should write again");

        let backup = fs::read_to_string(file.backup_path()).expect("Backup should exist");
        assert!(backup.contains("resumable = true"));
    }

    #[test]
    fn test_invalid_config_not_written() {
        let (_dir, file) = config_file();

        let mut config = Config::default();
        config.http.retry_attempts = 0;

        assert!(matches!(file.write(&config), Err(ConfigError::Invalid(ref e)) if e.len() == 1));
        assert!(!file.path().exists());
    }

    #[test]
    fn test_unparsable_file() {
        let (_dir, file) = config_file();
        fs::write(file.path(), "this is not valid TOML {{{").expect("Should write file");

        assert!(matches!(file.read(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_empty_file_is_error() {
        let (_dir, file) = config_file();
        fs::write(file.path(), "  \n").expect("Should write file");

        assert!(matches!(file.read(), Err(ConfigError::Empty { .. })));
    }

    #[test]
    fn test_default_file_has_header() {
        let (_dir, file) = config_file();
        file.write_default().expect("Should write defaults");

        let contents = fs::read_to_string(file.path()).expect("Should read file");
        assert!(contents.starts_with("# Stowage configuration"));
        assert_eq!(file.read().unwrap(), Some(Config::default()));
    }

    #[test]
    fn test_other_version_is_read() {
        let (_dir, file) = config_file();
        fs::write(file.path(), "version = 7\n[download]\nresumable = false\n")
            .expect("Should write file");

        let loaded = file.read().unwrap().unwrap();
        assert_eq!(loaded.version, CONFIG_VERSION);
        assert!(!loaded.download.resumable);
    }
}
