//! Supabase REST reader for the LPI table.
//!
//! ### Specification
//!
//! - **Endpoint**: `GET {base_url}/rest/v1/{table}?select=*`
//! - **Authentication**: `apikey` header plus `Authorization: Bearer` with the same key.
//! - **Response**: JSON array of row objects, passed through untyped for normalization.

pub mod error;

pub use error::StoreError;

use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tradex_core::config::DEFAULT_TABLE;
use tradex_core::{AppConfig, DatasetSource, RawRecord};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "tradex/0.1";

/// Largest error body kept in [`StoreError::HttpError`].
const MAX_ERROR_BODY: usize = 512;

/// Store client configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    /// Table exposed through PostgREST (default: countries_lpi).
    pub table: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            table: DEFAULT_TABLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl StoreConfig {
    /// Build from application configuration.
    ///
    /// Returns [`StoreError::MissingCredentials`] when the URL or key is unset.
    pub fn from_app(config: &AppConfig) -> Result<Self, StoreError> {
        let base_url = config
            .store_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(StoreError::MissingCredentials("TRADEX_STORE_URL"))?;
        let api_key = config
            .store_key
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(StoreError::MissingCredentials("TRADEX_STORE_KEY"))?;

        Ok(Self {
            base_url,
            api_key,
            table: config.store_table.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Reads every row of the configured table.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: StoreConfig,
}

impl SupabaseClient {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        if config.base_url.is_empty() {
            return Err(StoreError::MissingCredentials("TRADEX_STORE_URL"));
        }
        if config.api_key.is_empty() {
            return Err(StoreError::MissingCredentials("TRADEX_STORE_KEY"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| StoreError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), self.config.table)
    }

    /// Fetch all rows as raw JSON objects.
    pub async fn fetch_all(&self) -> Result<Vec<RawRecord>, StoreError> {
        let start = Instant::now();
        let url = self.endpoint();

        tracing::debug!("reading store table: {}", self.config.table);

        let response = self
            .http
            .get(&url)
            .query(&[("select", "*")])
            .header("apikey", &self.config.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("store response status: {}", status);

        if status.is_client_error() || status.is_server_error() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(StoreError::HttpError { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await?;
        let rows = parse_rows(&bytes)?;

        tracing::debug!("store read completed in {:?}, {} rows", start.elapsed(), rows.len());

        Ok(rows)
    }
}

fn parse_rows(bytes: &[u8]) -> Result<Vec<RawRecord>, StoreError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| StoreError::Parse(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(StoreError::Parse("expected a JSON array of rows".into()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Parse(format!("row {i} is not an object"))),
        })
        .collect()
}

#[async_trait]
impl DatasetSource for SupabaseClient {
    async fn fetch_rows(&self) -> Result<Vec<RawRecord>, tradex_core::Error> {
        Ok(self.fetch_all().await?)
    }
}
