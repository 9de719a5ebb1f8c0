//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` or `query_timeout_ms` is below 100ms or above 5 minutes
    /// - `cache_ttl_secs` is 0 or above one day
    /// - `log_capacity` is 0
    /// - `store_table` is not a plain identifier
    /// - `api_prefix` is non-empty and does not start with `/`
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("timeout_ms", self.timeout_ms), ("query_timeout_ms", self.query_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.cache_ttl_secs > 86_400 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must not exceed one day".into() });
        }

        if self.log_capacity == 0 {
            return Err(ConfigError::Invalid { field: "log_capacity".into(), reason: "must be greater than 0".into() });
        }

        let table_ok = !self.store_table.is_empty()
            && self.store_table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !self.store_table.starts_with(|c: char| c.is_ascii_digit());
        if !table_ok {
            return Err(ConfigError::Invalid {
                field: "store_table".into(),
                reason: "must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*)".into(),
            });
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid { field: "api_prefix".into(), reason: "must start with '/'".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.translator_api_key.is_none() {
            tracing::warn!("translator_api_key is not set; /ask requests will fail until it is configured");
        }

        Ok(())
    }
}
