//! Bootstrap configuration loading
//!
//! Bootstrap values come from a small TOML file. Resolution order for the
//! file itself:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. `<config dir>/mup/config.toml`
//!
//! A missing or unreadable file is never fatal: the caller gets compiled
//! defaults and a warning in the log.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the bootstrap TOML file
pub const CONFIG_ENV_VAR: &str = "MUP_CONFIG";

/// Default HTTP port of the player service
pub const DEFAULT_PORT: u16 = 5740;

/// Default base URL of the music API server
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file; defaults to the platform data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Base URL of the music API server
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_path: None,
            api_base_url: default_api_base_url(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the resolved config file, falling back to defaults on any failure
    pub fn load_or_default(cli_arg: Option<&Path>) -> Self {
        let Some(path) = resolve_config_path(cli_arg, CONFIG_ENV_VAR) else {
            info!("No config file found, using compiled defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config {}: {} (using defaults)", path.display(), e);
                Self::default()
            }
        }
    }

    /// Database path, or the platform default when unset
    pub fn database_path_or_default(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("mup.db"))
    }
}

/// Locate the bootstrap config file
///
/// CLI and environment paths are returned even if they do not exist so the
/// caller can report them; the per-user path only when present.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("mup").join("config.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent data directory for the database
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mup"))
        .unwrap_or_else(|| PathBuf::from("./mup_data"))
}
