//! Configuration loading and root folder resolution
//!
//! Tests that touch GPDB_ROOT_FOLDER or GPDB_YT_API_KEY are marked
//! #[serial] so they never run concurrently.

use gpdb_common::config::{
    default_root_folder, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV, YOUTUBE_API_KEY_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = TomlConfig::load(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.port, 5740);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.sync_interval_secs, 5);
    assert_eq!(config.backup_interval_secs, 300);
    assert!(config.youtube_api_key.is_none());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gpdb.toml");
    std::fs::write(
        &path,
        r#"
        port = 8080
        sync_interval_secs = 10
        backup_interval_secs = 60
        saves_dir = "/backups"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.logging.level, "debug");

    let resolved = config.resolve(Some(Path::new("/srv/gpdb")));
    assert_eq!(resolved.sync_interval, Duration::from_secs(10));
    assert_eq!(resolved.backup_interval, Duration::from_secs(60));
    assert_eq!(resolved.saves_dir, PathBuf::from("/backups"));
    assert_eq!(resolved.database_path, PathBuf::from("/srv/gpdb/gpdb.db"));
    assert_eq!(resolved.log_file, PathBuf::from("/srv/gpdb/latest.log"));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gpdb.toml");
    std::fs::write(&path, "port = [").unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
fn test_zero_interval_is_clamped() {
    let config = TomlConfig::from_toml_str("sync_interval_secs = 0").unwrap();
    let resolved = config.resolve(Some(Path::new("/srv/gpdb")));
    assert_eq!(resolved.sync_interval, Duration::from_secs(1));
}

#[test]
#[serial]
fn test_cli_root_folder_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/gpdb-env-root");

    let root = resolve_root_folder(Some(Path::new("/tmp/gpdb-cli-root")), Some(Path::new("/tmp/gpdb-toml-root")));
    assert_eq!(root, PathBuf::from("/tmp/gpdb-cli-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_root_folder_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/gpdb-env-root");

    let root = resolve_root_folder(None, Some(Path::new("/tmp/gpdb-toml-root")));
    assert_eq!(root, PathBuf::from("/tmp/gpdb-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_root_folder_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root = resolve_root_folder(None, Some(Path::new("/tmp/gpdb-toml-root")));
    assert_eq!(root, PathBuf::from("/tmp/gpdb-toml-root"));

    let root = resolve_root_folder(None, None);
    assert_eq!(root, default_root_folder());
    assert!(root.ends_with("gpdb") || root.ends_with("gpdb_data"));
}

#[test]
#[serial]
fn test_api_key_from_environment() {
    env::set_var(YOUTUBE_API_KEY_ENV, "env-key");

    let resolved = TomlConfig::default_values().resolve(Some(Path::new("/srv/gpdb")));
    assert_eq!(resolved.youtube_api_key.as_deref(), Some("env-key"));

    let config = TomlConfig::from_toml_str(r#"youtube_api_key = "toml-key""#).unwrap();
    let resolved = config.resolve(Some(Path::new("/srv/gpdb")));
    assert_eq!(resolved.youtube_api_key.as_deref(), Some("toml-key"));

    env::remove_var(YOUTUBE_API_KEY_ENV);
}

#[test]
fn test_ensure_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("gpdb");

    let resolved = TomlConfig::default_values().resolve(Some(&root));
    resolved.ensure_directories().unwrap();

    assert!(root.is_dir());
    assert!(root.join("saves").is_dir());
}
