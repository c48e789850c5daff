//! Client configuration
//!
//! Configuration is layered: defaults, then a TOML file, then environment
//! variables. The result seeds a [`ServiceBuilder`](crate::http::ServiceBuilder)
//! through [`ServiceBuilder::from_config`](crate::http::ServiceBuilder::from_config).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::TimeoutConfig;
use crate::{Error, Result};

pub const ENV_BASE_URL: &str = "NETRESULT_BASE_URL";
pub const ENV_USER_AGENT: &str = "NETRESULT_USER_AGENT";
pub const ENV_CALL_TIMEOUT_MS: &str = "NETRESULT_CALL_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "NETRESULT_CONNECT_TIMEOUT_MS";
pub const ENV_READ_TIMEOUT_MS: &str = "NETRESULT_READ_TIMEOUT_MS";
pub const ENV_WRITE_TIMEOUT_MS: &str = "NETRESULT_WRITE_TIMEOUT_MS";

/// Settings for one HTTP client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL endpoints are resolved against
    pub base_url: Option<String>,

    pub user_agent: Option<String>,

    /// Headers sent with every request
    pub default_headers: BTreeMap<String, String>,

    /// Keep cookies in a private in-memory store
    pub cookie_store: bool,

    pub timeouts: TimeoutConfig,
}

impl ClientConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Configuration {
            message: format!("Invalid client configuration: {}", e),
            source: Some(e.into()),
        })
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            message: format!("Failed to read {}", path.display()),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded client configuration");
        Ok(config)
    }

    /// Apply `NETRESULT_*` environment overrides on top of this configuration
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with(|name| std::env::var(name).ok())
    }

    fn merge_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = Some(user_agent);
        }

        let millis = |name: &str| -> Result<Option<Duration>> {
            lookup(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| Error::Configuration {
                            message: format!(
                                "{} must be a number of milliseconds, got '{}'",
                                name, raw
                            ),
                            source: Some(e.into()),
                        })
                })
                .transpose()
        };
        if let Some(timeout) = millis(ENV_CALL_TIMEOUT_MS)? {
            self.timeouts.call = Some(timeout);
        }
        if let Some(timeout) = millis(ENV_CONNECT_TIMEOUT_MS)? {
            self.timeouts.connect = Some(timeout);
        }
        if let Some(timeout) = millis(ENV_READ_TIMEOUT_MS)? {
            self.timeouts.read = Some(timeout);
        }
        if let Some(timeout) = millis(ENV_WRITE_TIMEOUT_MS)? {
            self.timeouts.write = Some(timeout);
        }
        Ok(())
    }

    /// Check the base URL parses and no timeout is zero
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            Url::parse(base_url).map_err(|source| Error::InvalidBaseUrl {
                url: base_url.clone(),
                source,
            })?;
        }
        self.timeouts.validate().map_err(Error::configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, None);
        assert!(!config.cookie_store);
        assert_eq!(config.timeouts, TimeoutConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://api.example.com/v1/"
            cookie_store = true

            [default_headers]
            Accept-Language = "en"

            [timeouts]
            connect_ms = 2000
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/v1/"));
        assert!(config.cookie_store);
        assert_eq!(config.default_headers.get("Accept-Language").map(String::as_str), Some("en"));
        assert_eq!(config.timeouts.connect, Some(Duration::from_secs(2)));
        assert_eq!(config.timeouts.read, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = ClientConfig::from_toml_str("cookie_store = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "user_agent = \"netresult-test\"").unwrap();
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.user_agent.as_deref(), Some("netresult-test"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://file.example.com/"
            [timeouts]
            read_ms = 100
            "#,
        )
        .unwrap();
        config
            .merge_with(lookup(&[
                (ENV_BASE_URL, "https://env.example.com/"),
                (ENV_READ_TIMEOUT_MS, "750"),
            ]))
            .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://env.example.com/"));
        assert_eq!(config.timeouts.read, Some(Duration::from_millis(750)));
        assert_eq!(config.timeouts.connect, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_env_rejects_non_numeric_timeout() {
        let mut config = ClientConfig::default();
        let err = config
            .merge_with(lookup(&[(ENV_CALL_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CALL_TIMEOUT_MS));
    }

    #[test]
    fn test_validate() {
        let config = ClientConfig {
            base_url: Some("not a url".to_string()),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidBaseUrl { .. })));

        let config = ClientConfig {
            timeouts: TimeoutConfig::default().with_read(Duration::ZERO),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration { .. })));
    }
}
