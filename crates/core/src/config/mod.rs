//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STEALTH_FETCH_*)
//! 2. TOML config file (if STEALTH_FETCH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::impersonate::{DEFAULT_IMPERSONATE, Impersonate};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// These values form the long-lived transport session shared by every tool
/// call. Per-call `session_options` and `request_options` layer on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default browser impersonation target.
    ///
    /// Set via STEALTH_FETCH_IMPERSONATE environment variable.
    #[serde(default = "default_impersonate")]
    pub impersonate: String,

    /// Default request timeout in seconds.
    ///
    /// Set via STEALTH_FETCH_TIMEOUT_SECS environment variable.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Maximum response body size in bytes.
    ///
    /// Set via STEALTH_FETCH_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects followed per request.
    ///
    /// Set via STEALTH_FETCH_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent override. When unset the impersonation profile decides.
    ///
    /// Set via STEALTH_FETCH_USER_AGENT environment variable.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Proxy URL applied to every request.
    ///
    /// Set via STEALTH_FETCH_PROXY environment variable.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Whether TLS certificates are verified.
    ///
    /// Set via STEALTH_FETCH_VERIFY_TLS environment variable.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Base headers sent with every request.
    ///
    /// Set via STEALTH_FETCH_HEADERS__<NAME> environment variables.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_impersonate() -> String {
    DEFAULT_IMPERSONATE.into()
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_redirects() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            impersonate: default_impersonate(),
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            user_agent: None,
            proxy: None,
            verify_tls: true,
            headers: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    /// The configured impersonation target, falling back to the default
    /// when the stored name does not parse.
    pub fn impersonate_target(&self) -> Impersonate {
        self.impersonate.parse().unwrap_or_default()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STEALTH_FETCH_`
    /// 2. TOML file from `STEALTH_FETCH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STEALTH_FETCH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STEALTH_FETCH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.impersonate, "chrome");
        assert_eq!(config.timeout_secs, 30.0);
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_redirects, 10);
        assert!(config.user_agent.is_none());
        assert!(config.proxy.is_none());
        assert!(config.verify_tls);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig { timeout_secs: 2.5, ..Default::default() };
        assert_eq!(config.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STEALTH_FETCH_IMPERSONATE", "firefox133");
            jail.set_env("STEALTH_FETCH_TIMEOUT_SECS", "12.5");
            jail.set_env("STEALTH_FETCH_HEADERS__X-TEAM", "crawl");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.impersonate, "firefox133");
            assert_eq!(config.timeout_secs, 12.5);
            assert_eq!(config.headers.get("x-team").map(String::as_str), Some("crawl"));
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "stealth.toml",
                r#"
                    max_redirects = 3
                    proxy = "http://127.0.0.1:8080"
                "#,
            )?;
            jail.set_env("STEALTH_FETCH_CONFIG_FILE", "stealth.toml");
            jail.set_env("STEALTH_FETCH_MAX_REDIRECTS", "4");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.max_redirects, 4);
            assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:8080"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STEALTH_FETCH_IMPERSONATE", "netscape4");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
