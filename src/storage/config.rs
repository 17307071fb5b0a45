use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub offline_mode: bool,
    pub fetch_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub first_day_of_week: String,
    pub theme: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            offline_mode: false,
            fetch_on_start: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pastelcal")
                .join("pastelcal.db"),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            first_day_of_week: "Sunday".to_string(),
            theme: "light".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the file at `path`, writing the defaults there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pastelcal")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_local_api() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn default_config_starts_weeks_on_sunday() {
        let config = Config::default();
        assert_eq!(config.ui.first_day_of_week, "Sunday");
    }

    #[test]
    fn default_database_lives_under_app_dir() {
        let config = Config::default();
        assert!(config.storage.database_path.ends_with("pastelcal/pastelcal.db"));
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r#"
            [api]
            base_url = "https://calendar.example.com"
            timeout_secs = 5

            [sync]
            offline_mode = true
            fetch_on_start = false

            [storage]
            database_path = "/tmp/cal.db"

            [ui]
            first_day_of_week = "Monday"
            theme = "dark"
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.api.base_url, "https://calendar.example.com");
        assert!(config.sync.offline_mode);
        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/cal.db"));
        assert_eq!(config.ui.theme, "dark");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::from_toml("[ui]\ntheme = \"dark\"\n").unwrap();

        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.ui.first_day_of_week, "Sunday");
        assert_eq!(config.ui.theme, "dark");
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let invalid_toml = "this is not valid toml";
        let result = Config::from_toml(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pastelcal").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config, Config::default());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
