//! Configuration manager - main API for config operations

use crate::persistence::ConfigFile;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;

const FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "STOWAGE";

/// Loads, edits and saves `config.toml` in one directory
pub struct ConfigManager {
    file: ConfigFile,
}

impl ConfigManager {
    /// Uses the platform config directory
    ///
    /// - Linux: `~/.config/stowage/`
    /// - macOS: `~/Library/Application Support/stowage/`
    /// - Windows: `%APPDATA%\stowage\config\`
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "stowage").ok_or(ConfigError::NoConfigDir)?;
        Self::with_directory(dirs.config_dir().to_path_buf())
    }

    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        Ok(Self {
            file: ConfigFile::new(config_dir.join(FILE_NAME)),
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Reads the config file, or the defaults when there is none
    pub fn load(&self) -> ConfigResult<Config> {
        match self.file.read()? {
            Some(config) => Ok(config),
            None => {
                log::info!(
                    "No config file at {}, using defaults",
                    self.file.path().display()
                );
                Ok(Config::default())
            }
        }
    }

    /// Validates and writes `config`, keeping the previous file as a backup
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.file.write(config)
    }

    /// Changes one setting in the file, e.g. `set("download.buffer_size", "8192")`
    ///
    /// Nothing is written when the key is unknown or the new value is invalid.
    pub fn set(&self, key: &str, value: &str) -> ConfigResult<Config> {
        let mut config = self.load()?;
        config.set(key, value)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Writes a commented default file unless one exists
    ///
    /// Returns whether a file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.file.path().exists() {
            return Ok(false);
        }
        self.file.write_default()?;
        Ok(true)
    }

    /// Overwrites the file with the defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Lists the problems in the config file, empty when it is valid
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        Ok(match self.load()?.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        })
    }

    /// Loads the file and applies `STOWAGE_<SECTION>_<FIELD>` variables
    ///
    /// Variables that do not parse are logged and ignored.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        if let Err(errors) = config.validate() {
            for error in &errors {
                log::warn!("After environment overrides: {}", error);
            }
        }
        Ok(config)
    }
}

/// Name of the variable overriding `key`, e.g. `STOWAGE_HTTP_USER_AGENT`
fn env_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.replace('.', "_").to_ascii_uppercase())
}

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    for key in Config::keys() {
        let name = env_name(&key);
        if let Some(value) = lookup(&name) {
            match config.set(&key, &value) {
                Ok(()) => log::debug!("{} overrides {}", name, key),
                Err(e) => log::warn!("Ignoring {}={:?}: {}", name, value, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn setup_test_manager() -> (TempDir, ConfigManager) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())
            .expect("Failed to create manager");
        (temp_dir, manager)
    }

    #[test]
    fn test_new_manager() {
        let manager = ConfigManager::new().expect("Should find a config dir");
        assert!(manager.config_path().ends_with("config.toml"));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let (_temp_dir, manager) = setup_test_manager();
        assert_eq!(manager.load().expect("Should load"), Config::default());
        assert!(!manager.config_path().exists());
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, manager) = setup_test_manager();

        let mut config = Config::default();
        config.http.user_agent = "mirror-bot/2.0".to_string();

        manager.save(&config).expect("Should save config");
        let loaded = manager.load().expect("Should load config");

        assert_eq!(loaded.http.user_agent, "mirror-bot/2.0");
    }

    #[test]
    fn test_set_writes_file() {
        let (_temp_dir, manager) = setup_test_manager();

        let config = manager
            .set("download.max_continuations", "4")
            .expect("Should set");
        assert_eq!(config.download.max_continuations, Some(4));
        assert_eq!(
            manager.load().expect("Should load").download.max_continuations,
            Some(4)
        );
    }

    #[test]
    fn test_set_invalid_value_leaves_file() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.save(&Config::default()).expect("Should save");

        let result = manager.set("download.buffer_size", "16");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert!(matches!(
            manager.set("download.speed", "fast"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(manager.load().expect("Should load"), Config::default());
    }

    #[test]
    fn test_initialize_creates_file_once() {
        let (_temp_dir, manager) = setup_test_manager();

        assert!(manager.initialize().expect("Should initialize"));
        assert!(manager.config_path().exists());
        assert!(!manager.initialize().expect("Should initialize"));
    }

    #[test]
    fn test_reset() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.set("download.buffer_size", "4096").expect("Should set");

        manager.reset().expect("Should reset");
        assert_eq!(manager.load().expect("Should load"), Config::default());
    }

    #[test]
    fn test_validate_reports_file_problems() {
        let (_temp_dir, manager) = setup_test_manager();
        manager.save(&Config::default()).expect("Should save");
        assert!(manager.validate().expect("Should validate").is_empty());

        std::fs::write(manager.config_path(), "[download]\nmax_continuations = 0\n")
            .expect("Should write");
        let problems = manager.validate().expect("Should validate");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("download.max_continuations"));
    }

    #[test]
    fn test_env_names() {
        assert_eq!(env_name("http.user_agent"), "STOWAGE_HTTP_USER_AGENT");
        assert_eq!(
            env_name("download.max_continuations"),
            "STOWAGE_DOWNLOAD_MAX_CONTINUATIONS"
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STOWAGE_DOWNLOAD_MAX_CONTINUATIONS", "25"),
            ("STOWAGE_DOWNLOAD_RESUMABLE", "false"),
            ("STOWAGE_HTTP_RETRY_ATTEMPTS", "not-a-number"),
            ("STOWAGE_HTTP_USER_AGENT", "mirror-bot/3"),
        ]);

        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.download.max_continuations, Some(25));
        assert!(!config.download.resumable);
        assert_eq!(config.http.retry_attempts, 3);
        assert_eq!(config.http.user_agent, "mirror-bot/3");
    }

    #[test]
    fn test_env_unlimited_continuations() {
        let mut config = Config::default();
        config.download.max_continuations = Some(9);

        apply_env_overrides(&mut config, |name| {
            (name == "STOWAGE_DOWNLOAD_MAX_CONTINUATIONS").then(|| "unlimited".to_string())
        });
        assert_eq!(config.download.max_continuations, None);
    }
}
