//! Translator client error types.

use std::sync::Arc;

/// Errors from the chat completions client.
#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    /// Missing TRADEX_TRANSLATOR_API_KEY.
    #[error("missing API key: TRADEX_TRANSLATOR_API_KEY not set")]
    MissingApiKey,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the provider.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}: {message}")]
    HttpError { status: u16, message: String },

    /// No choices, or a choice without content.
    #[error("empty response: no completion content")]
    EmptyResponse,

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranslatorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TranslatorError::Timeout } else { TranslatorError::Network(Arc::new(err)) }
    }
}

impl From<TranslatorError> for tradex_core::Error {
    fn from(err: TranslatorError) -> Self {
        match err {
            TranslatorError::Timeout => tradex_core::Error::TranslatorTimeout("translator request timed out".into()),
            TranslatorError::EmptyResponse => tradex_core::Error::EmptyTranslation,
            other => tradex_core::Error::TranslatorFailed(other.to_string()),
        }
    }
}
