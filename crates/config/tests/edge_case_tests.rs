//! Edge case and error scenario tests

use std::fs;
use stowage_config::{Config, ConfigError, ConfigManager};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_complete_workflow() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    assert!(!manager.config_path().exists());

    assert!(manager.initialize()?);
    assert!(manager.config_path().exists());
    assert_eq!(manager.load()?, Config::default());
    assert!(manager.validate()?.is_empty());

    manager.set("http.timeout_secs", "600")?;
    manager.set("download.max_continuations", "8")?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded.http.timeout_secs, 600);
    assert_eq!(reloaded.download.max_continuations, Some(8));

    manager.reset()?;
    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_corrupted_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let config_path = manager.config_path();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, "this is not valid TOML {{{")?;

    assert!(matches!(manager.load(), Err(ConfigError::Parse { .. })));
    assert!(manager.load_with_env_overrides().is_err());
    assert!(manager.set("download.resumable", "false").is_err());

    // the unreadable file is left for the user to fix
    assert_eq!(fs::read_to_string(&config_path)?, "this is not valid TOML {{{");

    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());

    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.http.retry_attempts = 1;
    config.http.connect_timeout_secs = 300;
    config.download.max_continuations = Some(1);
    assert!(config.validate().is_ok());

    config.http.retry_attempts = 11;
    assert!(config.validate().is_err());

    config.http.retry_attempts = 10;
    config.download.max_continuations = Some(10_001);
    assert!(config.validate().is_err());
}

#[test]
fn test_unlimited_continuations_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.download.max_continuations = None;
    manager.save(&config)?;

    let contents = fs::read_to_string(manager.config_path())?;
    assert!(!contents.contains("max_continuations"));
    assert_eq!(manager.load()?.download.max_continuations, None);

    Ok(())
}

#[test]
fn test_partial_config_toml() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(
        manager.config_path(),
        r#"
[download]
max_continuations = 3
"#,
    )?;

    let config = manager.load()?;
    assert_eq!(config.download.max_continuations, Some(3));
    assert!(config.download.resumable);
    assert_eq!(config.http, Config::default().http);

    Ok(())
}

#[test]
fn test_header_injection_in_user_agent_rejected() {
    let mut config = Config::default();
    config.http.user_agent = "agent\r\nX-Evil: 1".to_string();

    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "http.user_agent");
}

#[test]
fn test_set_with_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.save(&Config::default())?;

    let result = manager.set("download.buffer_size", "0");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    assert_eq!(manager.load()?.download.buffer_size, 64 * 1024);

    Ok(())
}

#[test]
fn test_backup_preserved_on_overwrite() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.http.max_redirects = 3;
    manager.save(&config)?;

    config.http.max_redirects = 7;
    manager.save(&config)?;

    let backup_path = manager.config_path().with_extension("toml.bak");
    let backup: Config = toml::from_str(&fs::read_to_string(backup_path)?)?;
    assert_eq!(backup.http.max_redirects, 3);
    assert_eq!(manager.load()?.http.max_redirects, 7);

    Ok(())
}

#[test]
fn test_invalid_file_values_load_with_warning() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "[http]\nretry_attempts = 0\n")?;

    let config = manager.load()?;
    assert_eq!(config.http.retry_attempts, 0);
    assert_eq!(manager.validate()?.len(), 1);

    Ok(())
}
