//! Configuration management for the Observatory client.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public endpoint of the Mozilla HTTP Observatory API.
pub const DEFAULT_BASE_URL: &str = "https://http-observatory.security.mozilla.org/api/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 5;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Main application configuration.
///
/// This is loaded from `~/.config/observatory/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API endpoint, polling and cache settings
    pub client: ClientConfig,
    /// Outbound proxy settings
    pub proxy: ProxyConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// if the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `OBSERVATORY_BASE_URL`: Override the API endpoint
    /// - `OBSERVATORY_TIMEOUT_SECS`: Override the request timeout
    /// - `OBSERVATORY_RETRIES`: Override the poll retry budget
    /// - `OBSERVATORY_LOG_LEVEL`: Override the verbosity level (0-2)
    /// - `OBSERVATORY_PROXY`, `OBSERVATORY_PROXY_USER`,
    ///   `OBSERVATORY_PROXY_PASSWORD`: Proxy URL and credentials
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Values that fail to parse are ignored and the file/default value is kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("OBSERVATORY_BASE_URL") {
            tracing::debug!("Override client.base_url from env: {}", val);
            self.client.base_url = val;
        }

        if let Some(val) = lookup("OBSERVATORY_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.client.timeout_secs = secs;
                tracing::debug!("Override client.timeout_secs from env: {}", secs);
            }
        }

        if let Some(val) = lookup("OBSERVATORY_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.client.retries = retries;
                tracing::debug!("Override client.retries from env: {}", retries);
            }
        }

        if let Some(val) = lookup("OBSERVATORY_LOG_LEVEL") {
            if let Ok(level) = val.parse() {
                self.client.log_level = level;
                tracing::debug!("Override client.log_level from env: {}", level);
            }
        }

        if let Some(val) = lookup("OBSERVATORY_PROXY") {
            tracing::debug!("Override proxy.url from env");
            self.proxy.url = Some(val);
        }

        if let Some(val) = lookup("OBSERVATORY_PROXY_USER") {
            self.proxy.username = Some(val);
        }

        if let Some(val) = lookup("OBSERVATORY_PROXY_PASSWORD") {
            self.proxy.password = Some(val);
        }
    }

    /// Replace unset values with the built-in defaults.
    ///
    /// An empty base URL, a zero timeout and a zero retry budget all mean
    /// "use the default". A trailing `/` on the base URL is dropped.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let trimmed = self.client.base_url.trim().trim_end_matches('/');
        self.client.base_url = if trimmed.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            trimmed.to_string()
        };

        if self.client.timeout_secs == 0 {
            self.client.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.client.retries == 0 {
            self.client.retries = DEFAULT_RETRIES;
        }
        self
    }

    /// Check values that would only fail later, at request time.
    pub fn validate(&self) -> ConfigResult<()> {
        match url::Url::parse(&self.client.base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ConfigError::InvalidValue {
                    field: "client.base_url".to_string(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    field: "client.base_url".to_string(),
                    reason: e.to_string(),
                });
            }
        }

        if self.client.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.poll_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(proxy) = self.proxy.url.as_deref().filter(|u| !u.trim().is_empty()) {
            if url::Url::parse(proxy).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: "proxy.url".to_string(),
                    reason: format!("'{proxy}' is not a valid URL"),
                });
            }
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/observatory/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "observatory", "observatory")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// API endpoint, polling and cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API, without trailing slash
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of poll attempts before giving up on a pending scan
    pub retries: u32,
    /// Fixed delay between two poll attempts, in milliseconds
    pub poll_interval_ms: u64,
    /// How long a finished scan stays usable after its end time, in seconds
    pub cache_ttl_secs: u64,
    /// Verbosity: 0 = quiet, 1 = verbose, 2 = debug
    pub log_level: u8,
}

impl ClientConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll backoff as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Cache validity window as a `Duration`.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            log_level: 0,
        }
    }
}

/// Outbound proxy settings.
///
/// When `url` is unset the system proxy environment is used as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://proxy.example.net:8080`
    pub url: Option<String>,
    /// Basic-auth user name
    pub username: Option<String>,
    /// Basic-auth password (never serialized back to disk)
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.timeout_secs, 10);
        assert_eq!(config.client.retries, 5);
        assert_eq!(config.client.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.client.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.client.log_level, 0);
        assert!(config.proxy.url.is_none());
    }

    #[test]
    fn test_normalized_fills_zero_values() {
        let mut config = AppConfig::default();
        config.client.base_url = String::new();
        config.client.timeout_secs = 0;
        config.client.retries = 0;

        let config = config.normalized();
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.timeout_secs, 10);
        assert_eq!(config.client.retries, 5);
    }

    #[test]
    fn test_normalized_strips_trailing_slash() {
        let mut config = AppConfig::default();
        config.client.base_url = "http://127.0.0.1:10000/".to_string();

        let config = config.normalized();
        assert_eq!(config.client.base_url, "http://127.0.0.1:10000");
    }

    #[test]
    fn test_validate() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.client.base_url = "ftp://example.org".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "client.base_url"
        ));

        let mut config = AppConfig::default();
        config.client.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.proxy.url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OBSERVATORY_BASE_URL", "http://localhost:8080/api/v1"),
            ("OBSERVATORY_TIMEOUT_SECS", "30"),
            ("OBSERVATORY_RETRIES", "bogus"),
            ("OBSERVATORY_LOG_LEVEL", "2"),
            ("OBSERVATORY_PROXY", "http://proxy.local:3128"),
            ("OBSERVATORY_PROXY_USER", "alice"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.client.base_url, "http://localhost:8080/api/v1");
        assert_eq!(config.client.timeout_secs, 30);
        // Unparseable values keep the previous setting
        assert_eq!(config.client.retries, 5);
        assert_eq!(config.client.log_level, 2);
        assert_eq!(config.proxy.url.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(config.proxy.username.as_deref(), Some("alice"));
        assert!(config.proxy.password.is_none());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.client.retries = 8;
        config.proxy.url = Some("http://proxy.local:3128".to_string());
        config.proxy.password = Some("secret".to_string());

        config.save_to(&config_path).expect("save config");
        let loaded = AppConfig::load_from(&config_path).expect("load config");

        assert_eq!(loaded.client.retries, 8);
        assert_eq!(loaded.proxy.url.as_deref(), Some("http://proxy.local:3128"));
        // Password is not written to disk
        assert!(loaded.proxy.password.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded =
            AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load defaults");
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[client]
retries = 3
poll_interval_ms = 500
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.client.retries, 3);
        assert_eq!(config.client.poll_interval_ms, 500);
        // These should be defaults
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.cache_ttl_secs, 600);
    }
}
