//! Configuration loading tests

use geofencing::config::Config;
use serial_test::serial;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_VARS: [&str; 5] = [
    "GEOFENCING_SQLITE_PATH",
    "GEOFENCING_NAMESPACE",
    "GEOFENCING_PROVIDER_TIMEOUT",
    "GEOFENCING_LOG_LEVEL",
    "GEOFENCING_LOG_FORMAT",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn test_repository_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml");
    let config = Config::from_file(&path).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.storage.namespace, "geofencing_plugin_cache");
    assert_eq!(
        config.coordinator.provider_timeout(),
        Some(Duration::from_secs(30))
    );
}

#[test]
fn test_missing_file_is_error() {
    let err = Config::from_file(Path::new("/nonexistent/geofencing.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[storage\nnamespace = ").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.storage.sqlite_path, PathBuf::from("data/geofences.db"));
    assert_eq!(config.storage.namespace, "geofencing_plugin_cache");
    assert_eq!(config.coordinator.provider_timeout(), None);
    assert_eq!(config.logging.format, "text");
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("GEOFENCING_SQLITE_PATH", "/tmp/fences.db");
    std::env::set_var("GEOFENCING_NAMESPACE", "test_ns");
    std::env::set_var("GEOFENCING_PROVIDER_TIMEOUT", "5");
    std::env::set_var("GEOFENCING_LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/fences.db"));
    assert_eq!(config.storage.namespace, "test_ns");
    assert_eq!(
        config.coordinator.provider_timeout(),
        Some(Duration::from_secs(5))
    );
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_rejects_bad_timeout() {
    clear_env();
    std::env::set_var("GEOFENCING_PROVIDER_TIMEOUT", "soon");

    let result = Config::from_env();
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("GEOFENCING_PROVIDER_TIMEOUT"));
}

#[test]
#[serial]
fn test_from_env_log_level_drives_filter() {
    clear_env();
    std::env::set_var("GEOFENCING_LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    clear_env();

    assert!(config.validate().is_ok());
    assert_eq!(config.logging.filter_directive(false), "geofencing=debug,warn");
}

#[test]
#[serial]
fn test_from_env_rejects_bad_log_level() {
    clear_env();
    std::env::set_var("GEOFENCING_LOG_LEVEL", "chatty");

    let config = Config::from_env().unwrap();
    clear_env();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("logging.level"));
}
