//! Store client error types.

use std::sync::Arc;

/// Errors from the Supabase REST client.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Base URL or key not configured.
    #[error("missing store credentials: {0} not set")]
    MissingCredentials(&'static str),

    /// HTTP error response.
    #[error("HTTP error: {status}: {body}")]
    HttpError { status: u16, body: String },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response was not a JSON array of objects.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { StoreError::Timeout } else { StoreError::Network(Arc::new(err)) }
    }
}

impl From<StoreError> for tradex_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => tradex_core::Error::StoreTimeout("store request timed out".into()),
            other => tradex_core::Error::StoreFetch(other.to_string()),
        }
    }
}
