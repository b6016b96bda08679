//! TOML configuration for the GamePulse dashboard.
//!
//! Resolution order: the file named by `GAMEPULSE_CONFIG`, else
//! `./gamepulse.toml` when present, else built-in defaults. The API base URL
//! can then be overridden with `GAMEPULSE_API_BASE_URL`.

use crate::error::ConfigError;
use crate::types::{DataSource, LoadRequest, TimePeriod};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "GAMEPULSE_CONFIG";
pub const API_BASE_URL_ENV: &str = "GAMEPULSE_API_BASE_URL";
pub const DEFAULT_CONFIG_FILE: &str = "gamepulse.toml";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GamePulseConfig {
    pub api: ApiConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
    /// Source files to load on startup when the backend is not ready yet.
    pub load: Option<LoadRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub trending_limit: Option<u32>,
    pub top_comments_limit: Option<u32>,
    pub top_comments_sort: Option<String>,
    pub wordcloud_width: Option<u32>,
    pub wordcloud_height: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            user_agent: format!("gamepulse/{}", env!("CARGO_PKG_VERSION")),
            trending_limit: None,
            top_comments_limit: None,
            top_comments_sort: None,
            wordcloud_width: None,
            wordcloud_height: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub time_period: TimePeriod,
    pub data_source: DataSource,
    /// Re-check backend readiness at this interval while not ready.
    pub status_poll_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "gamepulse=info,gamepulse_client=info,dashboard=info".to_string(),
        }
    }
}

impl GamePulseConfig {
    /// Loads configuration from the environment-selected file and overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies environment overrides through `lookup`, so callers and tests
    /// can supply their own variable source.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(API_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("API base URL overridden by {}", API_BASE_URL_ENV);
            self.api.base_url = base_url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|_| ConfigError::InvalidValue {
            field: "api.base_url".to_string(),
            value: self.api.base_url.clone(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: self.api.base_url.clone(),
            });
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "api.request_timeout_secs must be greater than zero".to_string(),
            });
        }

        if !self.dashboard.data_source.is_supported() {
            return Err(ConfigError::InvalidValue {
                field: "dashboard.data_source".to_string(),
                value: self.dashboard.data_source.to_string(),
            });
        }

        if let Some(0) = self.dashboard.status_poll_secs {
            return Err(ConfigError::ValidationFailed {
                reason: "dashboard.status_poll_secs must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GamePulseConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.dashboard.time_period, TimePeriod::Day);
        assert_eq!(config.dashboard.data_source, DataSource::Reddit);
        assert!(config.load.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = GamePulseConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://pulse.internal:9000/api"
            request_timeout_secs = 5
            trending_limit = 20
            wordcloud_width = 1024

            [dashboard]
            time_period = "week"
            status_poll_secs = 15

            [logging]
            filter = "debug"

            [load]
            posts_file = "data/posts.json"
            comments_file = "data/comments.json"
            analysis_file = "data/sentiment.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://pulse.internal:9000/api");
        assert_eq!(config.api.request_timeout_secs, 5);
        assert_eq!(config.api.trending_limit, Some(20));
        assert_eq!(config.api.wordcloud_width, Some(1024));
        assert_eq!(config.api.wordcloud_height, None);
        assert_eq!(config.dashboard.time_period, TimePeriod::Week);
        assert_eq!(config.dashboard.status_poll_secs, Some(15));
        assert_eq!(config.logging.filter, "debug");
        assert!(config.load.unwrap().is_complete());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = GamePulseConfig::from_toml_str("[api\nbase_url = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_override_of_base_url() {
        let config = GamePulseConfig::default().with_overrides(|key| match key {
            API_BASE_URL_ENV => Some(" http://10.0.0.5:8000/api ".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000/api");

        let untouched = GamePulseConfig::default().with_overrides(|_| Some(String::new()));
        assert_eq!(untouched.api.base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GamePulseConfig::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "api.base_url"
        ));

        let mut config = GamePulseConfig::default();
        config.api.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));

        let mut config = GamePulseConfig::default();
        config.dashboard.data_source = DataSource::YouTube;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "dashboard.data_source"
        ));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let result = GamePulseConfig::from_file(Path::new("/nonexistent/gamepulse.toml"));
        assert!(matches!(result, Err(ConfigError::Unreadable { .. })));
    }
}
