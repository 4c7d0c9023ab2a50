//! Bootstrap configuration and root folder resolution
//!
//! Configuration is read once at startup from a TOML file. A missing file
//! is not fatal: a warning is logged and built-in defaults are used. Paths
//! that are not set explicitly are derived from the root folder.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `GPDB_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML file
//! 4. OS-dependent default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GPDB_ROOT_FOLDER";

/// Environment variable providing the YouTube Data API key
pub const YOUTUBE_API_KEY_ENV: &str = "GPDB_YT_API_KEY";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database, saves, whitelist and logs
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// SQLite database file (default: `<root>/gpdb.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Backup directory (default: `<root>/saves`)
    #[serde(default)]
    pub saves_dir: Option<PathBuf>,

    /// Moderator whitelist JSON (default: `<root>/mod/mod_whitelist.json`)
    #[serde(default)]
    pub whitelist_path: Option<PathBuf>,

    /// Address the command server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the command server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between two reconciliation runs being queued
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Seconds between two automatic backups
    #[serde(default = "default_backup_interval_secs")]
    pub backup_interval_secs: u64,

    /// YouTube Data API key used for channel avatars
    #[serde(default)]
    pub youtube_api_key: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (default: `<root>/latest.log`)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

fn default_sync_interval_secs() -> u64 {
    5
}

fn default_backup_interval_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a file.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file
    /// is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default_values());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Configuration with every serde default applied
    pub fn default_values() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            saves_dir: None,
            whitelist_path: None,
            bind_address: default_bind_address(),
            port: default_port(),
            sync_interval_secs: default_sync_interval_secs(),
            backup_interval_secs: default_backup_interval_secs(),
            youtube_api_key: None,
            logging: LoggingConfig::default(),
        }
    }

    /// Resolve every path and interval against a root folder
    pub fn resolve(self, cli_root_folder: Option<&Path>) -> ResolvedConfig {
        let root_folder = resolve_root_folder(cli_root_folder, self.root_folder.as_deref());

        let youtube_api_key = self
            .youtube_api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(YOUTUBE_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());

        ResolvedConfig {
            database_path: self
                .database_path
                .unwrap_or_else(|| root_folder.join("gpdb.db")),
            saves_dir: self.saves_dir.unwrap_or_else(|| root_folder.join("saves")),
            whitelist_path: self
                .whitelist_path
                .unwrap_or_else(|| root_folder.join("mod").join("mod_whitelist.json")),
            log_file: self
                .logging
                .file
                .unwrap_or_else(|| root_folder.join("latest.log")),
            log_level: self.logging.level,
            bind_address: self.bind_address,
            port: self.port,
            sync_interval: Duration::from_secs(self.sync_interval_secs.max(1)),
            backup_interval: Duration::from_secs(self.backup_interval_secs.max(1)),
            youtube_api_key,
            root_folder,
        }
    }
}

/// Configuration with all paths made concrete
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub saves_dir: PathBuf,
    pub whitelist_path: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
    pub sync_interval: Duration,
    pub backup_interval: Duration,
    pub youtube_api_key: Option<String>,
}

impl ResolvedConfig {
    /// Create the root folder and the saves directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(&self.saves_dir)?;
        Ok(())
    }
}

/// Root folder resolution: CLI > environment > TOML > OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gpdb"))
        .unwrap_or_else(|| PathBuf::from("./gpdb_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.port, 5740);
        assert_eq!(config.sync_interval_secs, 5);
        assert_eq!(config.backup_interval_secs, 300);
        assert_eq!(config.logging.level, "info");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_explicit_paths_win_over_root() {
        let config = TomlConfig::from_toml_str(
            r#"
            database_path = "/data/registry.db"
            [logging]
            level = "debug"
            file = "/var/log/gpdb.log"
            "#,
        )
        .unwrap();

        let resolved = config.resolve(Some(Path::new("/srv/gpdb")));
        assert_eq!(resolved.root_folder, PathBuf::from("/srv/gpdb"));
        assert_eq!(resolved.database_path, PathBuf::from("/data/registry.db"));
        assert_eq!(resolved.saves_dir, PathBuf::from("/srv/gpdb/saves"));
        assert_eq!(
            resolved.whitelist_path,
            PathBuf::from("/srv/gpdb/mod/mod_whitelist.json")
        );
        assert_eq!(resolved.log_file, PathBuf::from("/var/log/gpdb.log"));
        assert_eq!(resolved.log_level, "debug");
    }
}
