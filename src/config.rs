//! Configuration for resample runs.

use crate::core::DatasetKind;
use crate::{DEFAULT_BASE_RATE, DEFAULT_NUM_FEATURES, DEFAULT_RESAMPLE_SIZES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings for resampling one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset path: a directory of recordings (bearing) or the stem of the
    /// base-rate table `<data_path>_4000.csv` (KBM)
    pub data_path: PathBuf,

    /// Dataset layout; inferred from `data_path` when absent
    pub dataset: Option<DatasetKind>,

    /// Channels per sample
    pub num_features: usize,

    /// Samples per KBM measurement
    pub base_rate: usize,

    /// Window counts produced by a batch run
    pub resample_sizes: Vec<usize>,

    /// Columns of the KBM base table to reduce (all columns when absent)
    pub kbm_columns: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data"),
            dataset: None,
            num_features: DEFAULT_NUM_FEATURES,
            base_rate: DEFAULT_BASE_RATE,
            resample_sizes: DEFAULT_RESAMPLE_SIZES.to_vec(),
            kbm_columns: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensor-resampler")
            .join("config.json")
    }

    /// The dataset layout, explicit or inferred from the path.
    pub fn dataset_kind(&self) -> DatasetKind {
        self.dataset
            .unwrap_or_else(|| DatasetKind::from_path(&self.data_path))
    }

    /// Parse a comma-separated list of window counts, e.g. `"10,30,100"`.
    pub fn parse_sizes(s: &str) -> Result<Vec<usize>, ConfigError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<usize>().map_err(|_| {
                    ConfigError::InvalidValue(format!("'{part}' is not a window count"))
                })
            })
            .collect()
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resample_sizes, vec![10, 30, 100, 300, 1000]);
        assert_eq!(config.base_rate, 4000);
        assert_eq!(config.num_features, 4);
    }

    #[test]
    fn test_dataset_kind_inference() {
        let mut config = Config {
            data_path: PathBuf::from("data/kbm_dataset/pumpe_v3"),
            ..Config::default()
        };
        assert_eq!(config.dataset_kind(), DatasetKind::Kbm);

        config.dataset = Some(DatasetKind::Bearing);
        assert_eq!(config.dataset_kind(), DatasetKind::Bearing);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            data_path: PathBuf::from("data/kbm_dataset/stabilus"),
            num_features: 5,
            resample_sizes: vec![10, 100],
            kbm_columns: Some(vec!["x".into(), "y".into()]),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"data_path": "data/bearing/2nd_test"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/bearing/2nd_test"));
        assert_eq!(config.base_rate, 4000);
    }

    #[test]
    fn test_parse_sizes() {
        assert_eq!(Config::parse_sizes("10, 30,100").unwrap(), vec![10, 30, 100]);
        assert!(Config::parse_sizes("10,ten").is_err());
    }
}
