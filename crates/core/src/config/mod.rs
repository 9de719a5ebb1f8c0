//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TRADEX_*)
//! 2. TOML config file (if TRADEX_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Default logical table name served by the store.
pub const DEFAULT_TABLE: &str = "countries_lpi";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TRADEX_*)
/// 2. TOML config file (if TRADEX_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface the HTTP server binds to.
    ///
    /// Set via TRADEX_HOST environment variable.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server listens on.
    ///
    /// Set via TRADEX_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix for the ask and logs routes.
    ///
    /// Set via TRADEX_API_PREFIX environment variable. Empty string mounts at root.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Base URL of the Supabase project (without `/rest/v1`).
    ///
    /// Set via TRADEX_STORE_URL environment variable.
    #[serde(default)]
    pub store_url: Option<String>,

    /// Supabase anon/service key.
    ///
    /// Set via TRADEX_STORE_KEY environment variable.
    #[serde(default)]
    pub store_key: Option<String>,

    /// Table holding the LPI rows.
    ///
    /// Set via TRADEX_STORE_TABLE environment variable.
    #[serde(default = "default_store_table")]
    pub store_table: String,

    /// OpenRouter API key for the translator.
    ///
    /// Set via TRADEX_TRANSLATOR_API_KEY environment variable.
    #[serde(default)]
    pub translator_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible chat completions API.
    ///
    /// Set via TRADEX_TRANSLATOR_BASE_URL environment variable.
    #[serde(default = "default_translator_base_url")]
    pub translator_base_url: String,

    /// Model identifier passed to the translator.
    ///
    /// Set via TRADEX_TRANSLATOR_MODEL environment variable.
    #[serde(default = "default_translator_model")]
    pub translator_model: String,

    /// Value for the `HTTP-Referer` attribution header.
    #[serde(default = "default_translator_referer")]
    pub translator_referer: String,

    /// Value for the `X-Title` attribution header.
    #[serde(default = "default_translator_title")]
    pub translator_title: String,

    /// User-Agent string for outbound HTTP requests.
    ///
    /// Set via TRADEX_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Outbound HTTP request timeout in milliseconds.
    ///
    /// Set via TRADEX_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound for one query execution against the snapshot.
    ///
    /// Set via TRADEX_QUERY_TIMEOUT_MS environment variable.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Snapshot freshness window in seconds.
    ///
    /// Set via TRADEX_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Number of activity log entries retained.
    ///
    /// Set via TRADEX_LOG_CAPACITY environment variable.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_api_prefix() -> String {
    "/api".into()
}

fn default_store_table() -> String {
    DEFAULT_TABLE.into()
}

fn default_translator_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

fn default_translator_model() -> String {
    "google/gemini-2.0-flash-001".into()
}

fn default_translator_referer() -> String {
    "http://localhost:3000".into()
}

fn default_translator_title() -> String {
    "TradeXchange AI Demo".into()
}

fn default_user_agent() -> String {
    "tradex/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_log_capacity() -> usize {
    50
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            store_url: None,
            store_key: None,
            store_table: default_store_table(),
            translator_api_key: None,
            translator_base_url: default_translator_base_url(),
            translator_model: default_translator_model(),
            translator_referer: default_translator_referer(),
            translator_title: default_translator_title(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Query execution bound as Duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Snapshot freshness window as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TRADEX_`
    /// 2. TOML file from `TRADEX_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("TRADEX_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TRADEX_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Store URL and key, both required before the first snapshot fetch.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if either value is not set.
    pub fn require_store_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = self.store_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "store_url".into(),
            hint: "Set TRADEX_STORE_URL environment variable".into(),
        })?;
        let key = self.store_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "store_key".into(),
            hint: "Set TRADEX_STORE_KEY environment variable".into(),
        })?;
        Ok((url, key))
    }

    /// Translator API key (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_translator_api_key(&self) -> Result<&str, ConfigError> {
        self.translator_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "translator_api_key".into(),
            hint: "Set TRADEX_TRANSLATOR_API_KEY environment variable".into(),
        })
    }
}
