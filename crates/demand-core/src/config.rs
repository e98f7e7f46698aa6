//! Configuration for model provisioning and history lookup.
//!
//! All configuration lives in `~/.demand/config/demand.toml`. Every section
//! is optional and missing keys fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DemandError, DemandResult};

/// Get the demand home directory (defaults to ~/.demand)
pub fn demand_home() -> DemandResult<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| DemandError::Config("Cannot determine home directory".to_string()))
        .map(|h| h.join(".demand"))
}

/// Path of the default configuration file.
pub fn default_config_path() -> DemandResult<PathBuf> {
    Ok(demand_home()?.join("config").join("demand.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemandConfig {
    /// Model artifact location
    #[serde(default)]
    pub model: ModelConfig,
    /// Optional historical demand file
    #[serde(default)]
    pub history: HistoryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the model artifact comes from and where it is cached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Remote source fetched when the local file is missing
    #[serde(default)]
    pub url: Option<String>,
    /// Local artifact path
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Expected SHA-256 of downloaded artifacts (hex)
    #[serde(default)]
    pub sha256: Option<String>,
    /// Download timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: default_model_path(),
            sha256: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl ModelConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_model_path() -> String {
    "~/.demand/cache/models/demand_model.json".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Historical demand CSV used for trends and lag features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            timestamp_column: default_timestamp_column(),
            value_column: default_value_column(),
        }
    }
}

impl HistoryConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(expand_home)
    }
}

fn default_timestamp_column() -> String {
    "timestamp".to_string()
}

fn default_value_column() -> String {
    "demand_mw".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> DemandResult<DemandConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !config_path.exists() {
        return Ok(DemandConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        DemandError::Config(format!("reading {}: {}", config_path.display(), e))
    })?;
    let config: DemandConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_path_under_demand_home() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with(".demand/config/demand.toml"));
    }

    #[test]
    fn test_default_config() {
        let config = DemandConfig::default();
        assert!(config.model.url.is_none());
        assert_eq!(config.model.timeout_seconds, 60);
        assert_eq!(config.history.timestamp_column, "timestamp");
        assert_eq!(config.history.value_column, "demand_mw");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[model]
url = "https://example.org/model.json"
timeout_seconds = 5
"#;
        let config: DemandConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.model.url.as_deref(),
            Some("https://example.org/model.json")
        );
        assert_eq!(config.model.timeout(), Duration::from_secs(5));
        assert_eq!(config.model.path, default_model_path());
        assert!(config.history.path.is_none());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.model.sha256.is_none());
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[model\nurl = ").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(DemandError::Config(_))
        ));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/model.json"), PathBuf::from("/abs/model.json"));
        assert_eq!(expand_home("rel/model.json"), PathBuf::from("rel/model.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.json"), home.join("x.json"));
        }
    }
}
