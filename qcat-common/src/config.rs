//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`QCAT_ROOT_FOLDER`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal; the caller logs a
//! warning and continues with defaults.

use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "QCAT_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "qcat.db";

/// Default listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 6626;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "qcat_api=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file path (stdout when absent)
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

/// `[pagination]` section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
    #[serde(default = "max_page_size")]
    pub max_page_size: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: max_page_size(),
        }
    }
}

impl PaginationConfig {
    /// Reject sizes that would make every listing empty or unbounded
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size < 1 || self.max_page_size < 1 {
            return Err(Error::Config("Page sizes must be at least 1".to_string()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "default_page_size ({}) exceeds max_page_size ({})",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn max_page_size() -> i64 {
    MAX_PAGE_SIZE
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// Load the TOML config
///
/// With an explicit path the file must exist. Without one, the platform
/// locations are probed and `Ok(None)` is returned when none exists.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<Option<TomlConfig>> {
    if let Some(path) = explicit_path {
        return TomlConfig::from_file(path).map(Some);
    }

    match default_config_file() {
        Some(path) => {
            debug!("Loading config file {}", path.display());
            TomlConfig::from_file(&path).map(Some)
        }
        None => Ok(None),
    }
}

/// First existing config file for the platform
fn default_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("qcat").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/qcat/config.toml"));
    }
    candidates.into_iter().find(|p| p.exists())
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/qcat (or /var/lib/qcat for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("qcat"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/qcat"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/qcat
        dirs::data_dir()
            .map(|d| d.join("qcat"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/qcat"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\qcat
        dirs::data_local_dir()
            .map(|d| d.join("qcat"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\qcat"))
    } else {
        PathBuf::from("./qcat_data")
    }
}

/// Resolves the root folder from the four configuration tiers
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: Option<&TomlConfig>) -> Self {
        Self {
            cli_arg,
            toml_root: toml_config.and_then(|c| c.root_folder.clone()),
        }
    }

    /// Resolve the root folder; always succeeds thanks to the compiled default
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
            warn!("{} is set but empty, ignoring", ROOT_FOLDER_ENV);
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates the database inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if it does not exist
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            tracing::info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Path of the catalog database
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pagination.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::from_toml_str(
            r#"
            root_folder = "/srv/qcat"

            [server]
            port = 9000

            [pagination]
            max_page_size = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/qcat")));
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.pagination.default_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.pagination.max_page_size, 100);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("root_folder = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_pagination_config_validation() {
        assert!(PaginationConfig::default().validate().is_ok());
        let bad = PaginationConfig {
            default_page_size: 50,
            max_page_size: 10,
        };
        assert!(bad.validate().is_err());
    }
}
