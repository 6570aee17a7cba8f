//! Configuration loading from TOML files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for gridline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub import: ImportConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: gridline_openf1::api::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Concurrent fetch ceiling per stage.
    pub concurrency: usize,
    /// Fetch attempts per unit before giving up on rate limiting.
    pub max_attempts: u32,
    /// First backoff delay; doubles on each further attempt.
    pub base_delay_ms: u64,
    /// Race-query lower bound used before any import has succeeded.
    pub fallback_start_date: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_attempts: 5,
            base_delay_ms: 1000,
            fallback_start_date: "2024-01-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Config {
    /// Load ./gridline.toml if present, defaults otherwise.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("gridline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.import.concurrency, 3);
        assert_eq!(config.import.max_attempts, 5);
        assert_eq!(config.import.base_delay_ms, 1000);
        assert_eq!(config.store.data_dir, PathBuf::from("./data"));
        assert!(config.api.base_url.starts_with("https://"));
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[api]
base_url = "http://localhost:8080/v1"

[import]
concurrency = 6
max_attempts = 3

[store]
data_dir = "/tmp/gridline"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.import.concurrency, 6);
        assert_eq!(config.import.max_attempts, 3);
        // unset keys keep their defaults
        assert_eq!(config.import.base_delay_ms, 1000);
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/gridline"));
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.import.fallback_start_date, "2024-01-01");
    }
}
