//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ROLLCALL_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and compiled
//! defaults apply. A config file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ROLLCALL_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "rollcall.db";

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level (`RUST_LOG` still takes precedence)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Ingestion section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Number of ballot events processed concurrently by a batch run
    pub concurrency: usize,
    /// Skip events whose stored payload digest matches the incoming payload
    pub skip_unchanged: bool,
    /// Maximum total time spent retrying a write on a locked database
    pub max_lock_wait_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            skip_unchanged: false,
            max_lock_wait_ms: 5000,
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
}

impl TomlConfig {
    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load config from an explicit file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from the platform config location
    ///
    /// Falls back to defaults (with a warning) when no config file exists.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: LoggingConfig::default().level,
        }
    }
}

/// Resolves the root folder holding the database
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_config: None,
        }
    }

    /// Root folder given on the command line (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Already-loaded TOML config (priority 3)
    pub fn with_toml_config(mut self, config: TomlConfig) -> Self {
        self.toml_config = Some(config);
        self
    }

    /// Resolve the root folder following the priority order
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml_config.as_ref().and_then(|c| c.root_folder.clone()) {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path;
        }

        debug!(module = %self.module_name, "Root folder from compiled default");
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

/// Locate the config file for the platform, if one exists
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rollcall").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rollcall/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rollcall"))
        .unwrap_or_else(|| PathBuf::from("./rollcall_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str("[ingest]\nconcurrency = 8\n").unwrap();
        assert_eq!(config.ingest.concurrency, 8);
        assert_eq!(config.ingest.max_lock_wait_ms, 5000);
        assert_eq!(config.logging.level, "info");
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("root_folder = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
