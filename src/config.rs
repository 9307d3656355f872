//! Configuration for the proximity adaptor.

use crate::adaptor::{ProximityCodes, ADAPTOR_ID};
use crate::buffer::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry id of the adaptor to run
    pub adaptor: String,

    /// Substring matched against input device names during discovery
    pub device_match: String,

    /// Explicit device nodes; discovery is skipped when non-empty
    pub device_paths: Vec<PathBuf>,

    /// Capacity of the change buffer
    pub buffer_capacity: usize,

    /// Event codes carrying the proximity field
    pub codes: ProximityCodes,

    /// Path for storing stats
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adaptor: ADAPTOR_ID.to_string(),
            device_match: "proximity".to_string(),
            device_paths: Vec::new(),
            buffer_capacity: DEFAULT_CAPACITY,
            codes: ProximityCodes::default(),
            data_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("proximity-adaptor"),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proximity-adaptor")
            .join("config.json")
    }

    /// Path of the persisted stats file.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.adaptor, ADAPTOR_ID);
        assert_eq!(config.buffer_capacity, 1024);
        assert!(config.device_paths.is_empty());
        assert_eq!(config.codes, ProximityCodes::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(config.device_match, "proximity");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"buffer_capacity": 8, "device_paths": ["/dev/input/event3"]}"#)
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.buffer_capacity, 8);
        assert_eq!(config.device_paths, vec![PathBuf::from("/dev/input/event3")]);
        assert_eq!(config.adaptor, ADAPTOR_ID);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");

        let mut config = Config::default();
        config.device_match = "apds".into();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.device_match, "apds");
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
