//! Bootstrap configuration loading
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`EMAP_CONFIG`)
//! 3. Platform config file (`<config dir>/emap/ingest.toml`)
//! 4. Built-in defaults
//!
//! A missing TOML file never stops startup: the loader falls back to
//! defaults and reports it as a [`ConfigSource`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EMAP_CONFIG";

/// Default Google-compatible geocoding endpoint
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    ///
    /// If not specified, the platform data directory is used.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Geocoding provider configuration
    #[serde(default)]
    pub geocode: GeocodeConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
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

/// Geocoding provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeocodeConfig {
    /// Provider API key (database and environment take precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Geocode endpoint URL
    #[serde(default = "default_geocode_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum spacing between consecutive requests
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Optional region bias passed to the provider (e.g. "es")
    #[serde(default)]
    pub region: Option<String>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_geocode_endpoint(),
            timeout_secs: default_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            region: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_geocode_endpoint() -> String {
    DEFAULT_GEOCODE_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_interval_ms() -> u64 {
    50
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, degrading to defaults when no file is available
    ///
    /// Nothing is logged here: this runs before logging is set up, so the
    /// caller reports the returned [`ConfigSource`] once it is.
    pub fn load_or_default(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match path {
            Some(path) if path.exists() => {
                Ok((Self::load(path)?, ConfigSource::File(path.to_path_buf())))
            }
            Some(path) => Ok((Self::default(), ConfigSource::MissingFile(path.to_path_buf()))),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Database path from config, or the platform default
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Where the bootstrap configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file
    File(PathBuf),
    /// A path was given but no file exists there
    MissingFile(PathBuf),
    /// No config file candidate at all
    Defaults,
}

impl ConfigSource {
    /// True when built-in defaults are in effect
    pub fn is_default(&self) -> bool {
        !matches!(self, ConfigSource::File(_))
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "loaded from {}", path.display()),
            ConfigSource::MissingFile(path) => {
                write!(f, "{} not found, using built-in defaults", path.display())
            }
            ConfigSource::Defaults => write!(f, "no config file found, using built-in defaults"),
        }
    }
}

/// Resolve the config file path
///
/// Priority: CLI argument → environment variable → platform config file.
/// Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config file
    dirs::config_dir()
        .map(|d| d.join("emap").join("ingest.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("emap").join("emap.db"))
        .unwrap_or_else(|| PathBuf::from("./emap_data/emap.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.database_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.geocode.endpoint, DEFAULT_GEOCODE_ENDPOINT);
        assert_eq!(config.geocode.timeout_secs, 10);
        assert!(config.geocode.api_key.is_none());
    }

    #[test]
    fn test_partial_geocode_section() {
        let config = TomlConfig::from_toml_str(
            r#"
            database_path = "/tmp/emap.db"

            [geocode]
            api_key = "abc"
            region = "es"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/emap.db"));
        assert_eq!(config.geocode.api_key.as_deref(), Some("abc"));
        assert_eq!(config.geocode.region.as_deref(), Some("es"));
        assert_eq!(config.geocode.min_interval_ms, 50);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("database_path = [").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_arg_wins() {
        let path = resolve_config_path(Some(Path::new("/etc/emap/custom.toml")), "EMAP_TEST_UNSET_VAR");
        assert_eq!(path, Some(PathBuf::from("/etc/emap/custom.toml")));
    }
}
