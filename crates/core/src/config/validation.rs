//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::impersonate::Impersonate;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_secs` is not in (0, 300]
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_redirects` exceeds 1000
    /// - `impersonate` is not a recognized browser target
    /// - `proxy` is not an absolute URL
    /// - `user_agent` is set but empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timeout_secs > 0.0 && self.timeout_secs <= 300.0) {
            return Err(ConfigError::Invalid {
                field: "timeout_secs".into(),
                reason: "must be greater than 0 and at most 300".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.max_redirects > 1000 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 1000".into() });
        }

        if let Err(e) = self.impersonate.parse::<Impersonate>() {
            return Err(ConfigError::Invalid { field: "impersonate".into(), reason: e.to_string() });
        }

        if let Some(proxy) = &self.proxy
            && let Err(e) = url::Url::parse(proxy)
        {
            return Err(ConfigError::Invalid { field: "proxy".into(), reason: e.to_string() });
        }

        if let Some(ua) = &self.user_agent
            && ua.trim().is_empty()
        {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !self.verify_tls {
            tracing::warn!("TLS certificate verification is disabled for all requests");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_zero() {
        let config = AppConfig { timeout_secs: 0.0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_secs"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_secs: 300.5, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_secs"));
    }

    #[test]
    fn test_validate_timeout_nan() {
        let config = AppConfig { timeout_secs: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_unknown_impersonate() {
        let config = AppConfig { impersonate: "lynx".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "impersonate"));
    }

    #[test]
    fn test_validate_bad_proxy() {
        let config = AppConfig { proxy: Some("not a url".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "proxy"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: Some("  ".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_secs: 300.0, max_redirects: 1000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
