use crate::global;
use crate::jobs::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub polling: PollingConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the meeting-intelligence API
    pub base_url: String,
    pub request_timeout_seconds: u64,
    /// Maximum number of meetings fetched by the initial load
    pub list_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status polls while meetings are processing
    pub interval_ms: u64,
    /// Extra attempts for a failed status probe before the meeting is marked
    /// failed (default: 0, fail on first error)
    pub probe_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_seconds: 30,
            list_limit: 100,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            probe_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3838,
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        // A zero interval would spin.
        Duration::from_millis(self.interval_ms.max(100))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.probe_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.remote.base_url, "http://localhost:8000");
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert_eq!(config.polling.retry_policy(), RetryPolicy::fail_fast());
        assert!(config.api.enabled);
        assert_eq!(config.api.port, 3838);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[remote]\nbase_url = \"https://meetings.example.com\"\n\n[polling]\ninterval_ms = 2000\nprobe_retries = 2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.remote.base_url, "https://meetings.example.com");
        assert_eq!(config.remote.list_limit, 100);
        assert_eq!(config.polling.interval(), Duration::from_secs(2));
        assert_eq!(
            config.polling.retry_policy(),
            RetryPolicy {
                retries: 2,
                backoff: Duration::from_millis(500),
            }
        );
        assert_eq!(config.api.port, 3838);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.enabled = false;
        config.polling.interval_ms = 750;
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert!(!reloaded.api.enabled);
        assert_eq!(reloaded.polling.interval_ms, 750);
    }

    #[test]
    fn test_interval_has_floor() {
        let polling = PollingConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(polling.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling]\ninterval_ms = \"soon\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
