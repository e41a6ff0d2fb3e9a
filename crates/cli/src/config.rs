//! Configuration loading from capstan.toml.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use oauth::{ProviderEntry, RefreshPolicy};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Per-provider credential entries. Fields missing here fall back to
    /// `<PROVIDER>_CLIENT_ID` etc. in the environment.
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("capstan.db")
}

/// Token refresh timing, in seconds.
#[derive(Debug, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_lead_time")]
    pub lead_time_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            lead_time_secs: default_lead_time(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_lead_time() -> u64 {
    300
}

fn default_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a TOML file, or defaults if it is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The refresh policy this configuration describes.
    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            interval: Duration::from_secs(self.refresh.interval_secs),
            lead_time: chrono::Duration::seconds(self.refresh.lead_time_secs as i64),
            timeout: Duration::from_secs(self.refresh.timeout_secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_providers_and_refresh() {
        let config = Config::parse(
            r#"
            [database]
            path = "/var/lib/capstan/bindings.db"

            [refresh]
            interval_secs = 30
            lead_time_secs = 600

            [providers.google]
            client_id = "id"
            client_secret = "secret"
            redirect_uri = "https://example.com/cb"
            "#,
        )
        .unwrap();

        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.refresh.timeout_secs, 10); // default
        assert_eq!(
            config.providers["google"].client_id.as_deref(),
            Some("id")
        );
        let policy = config.refresh_policy();
        assert_eq!(policy.lead_time, chrono::Duration::seconds(600));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("capstan.db"));
        assert_eq!(config.refresh.interval_secs, 60);
        assert!(config.providers.is_empty());
    }
}
