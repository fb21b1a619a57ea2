// Integration test for configuration file support

use std::fs;
use std::path::PathBuf;
use streamlog::config::{LogConfig, LogFormat};
use streamlog::error::StreamlogError;
use streamlog::logs::{LogLevel, LoggerManager, StreamType};
use tempfile::TempDir;

#[test]
fn test_load_full_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("streamlog.toml");

    let toml_content = r#"
        enabled = true
        level = "debug"
        format = "json"

        [output.console]
        enabled = false
        colors = false

        [output.file]
        enabled = true
        filename = "/var/log/openlist/access.log"
        max_size_mb = 20
        max_files = 3
        async = true
        buffer_size = 64

        [access_log]
        enabled = true
        exclude_paths = ["/ping", "/assets"]
        include_paths = ["/api"]
        exclude_status = [304]
        include_status = []

        [media_log]
        enabled = true
        filename = "/var/log/openlist/media.log"

        [error_log]
        enabled = true

        [system_log]
        enabled = false
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let config = LogConfig::from_file(&config_path).unwrap();
    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.format, LogFormat::Json);
    assert!(!config.output.console.enabled);
    assert_eq!(config.output.file.max_size_mb, 20);
    assert_eq!(config.output.file.max_files, 3);
    assert!(config.output.file.async_write);
    assert_eq!(config.output.file.buffer_size, 64);
    assert_eq!(config.access_log.exclude_paths, vec!["/ping", "/assets"]);
    assert_eq!(config.access_log.include_paths, vec!["/api"]);
    assert_eq!(config.access_log.exclude_status, vec![304]);
    assert_eq!(
        config.media_filename(),
        PathBuf::from("/var/log/openlist/media.log")
    );
    assert!(!config.system_log.enabled);
}

#[test]
fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("streamlog.json");

    let json_content = r#"
        {
            "level": "warn",
            "output": {
                "file": { "filename": "logs/app.log", "async": false }
            },
            "access_log": { "exclude_paths": [] }
        }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let config = LogConfig::from_file(&config_path).unwrap();
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.format, LogFormat::Text);
    assert!(!config.output.file.async_write);
    assert!(config.access_log.exclude_paths.is_empty());
    assert_eq!(config.media_filename(), PathBuf::from("logs/media_access.log"));
}

#[test]
fn test_invalid_configs_are_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let bad_status = temp_dir.path().join("status.toml");
    fs::write(&bad_status, "[access_log]\nexclude_status = [1000]\n").unwrap();
    assert!(matches!(
        LogConfig::from_file(&bad_status),
        Err(StreamlogError::ConfigValidationError(_))
    ));

    let bad_syntax = temp_dir.path().join("broken.toml");
    fs::write(&bad_syntax, "level = ").unwrap();
    assert!(matches!(
        LogConfig::from_file(&bad_syntax),
        Err(StreamlogError::InvalidConfig(_))
    ));

    let bad_level = temp_dir.path().join("level.json");
    fs::write(&bad_level, r#"{"level":"verbose"}"#).unwrap();
    assert!(LogConfig::from_file(&bad_level).is_err());

    let missing = temp_dir.path().join("missing.toml");
    assert!(matches!(
        LogConfig::from_file(&missing),
        Err(StreamlogError::ConfigError(_))
    ));
}

#[test]
fn test_loaded_config_drives_manager() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("streamlog.toml");
    let log_path = temp_dir.path().join("out").join("app.log");

    let toml_content = format!(
        r#"
        [output.console]
        enabled = false

        [output.file]
        filename = "{}"
        async = false

        [media_log]
        enabled = false
        "#,
        log_path.display()
    );
    fs::write(&config_path, toml_content).unwrap();

    let manager = LoggerManager::new(LogConfig::from_file(&config_path).unwrap());
    assert!(manager.get_logger(StreamType::Media).is_none());
    assert!(manager.get_logger(StreamType::Access).is_some());
    assert!(log_path.exists());
    manager.close().unwrap();
}
