//! Unified error types for the ask pipeline.
//!
//! Each variant carries a stable code prefix in its display string so the
//! activity log and HTTP error bodies stay greppable.

use tokio_rusqlite::rusqlite;

/// Unified error types for the TradeXchange ask pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid request input (e.g., a blank question).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The durable store could not be read.
    #[error("STORE_FETCH_FAILED: {0}")]
    StoreFetch(String),

    /// The durable store did not answer in time.
    #[error("STORE_TIMEOUT: {0}")]
    StoreTimeout(String),

    /// The translator call failed (network, auth, HTTP status).
    #[error("TRANSLATOR_FAILED: {0}")]
    TranslatorFailed(String),

    /// The translator did not answer in time.
    #[error("TRANSLATOR_TIMEOUT: {0}")]
    TranslatorTimeout(String),

    /// The translator answered without any query text.
    #[error("EMPTY_TRANSLATION: translator returned no query text")]
    EmptyTranslation,

    /// The translated query failed the sanitizer's checks.
    #[error("QUERY_REJECTED: {0}")]
    QueryRejected(String),

    /// The sanitized query failed inside the embedded engine.
    #[error("EXECUTION_FAILED: {0}")]
    Execution(String),

    /// The embedded engine did not finish in time.
    #[error("EXECUTION_TIMEOUT: query exceeded {0}ms")]
    ExecutionTimeout(u64),

    /// Embedded engine setup failed (connection, table load).
    #[error("ENGINE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::StoreFetch(_) => "STORE_FETCH_FAILED",
            Error::StoreTimeout(_) => "STORE_TIMEOUT",
            Error::TranslatorFailed(_) => "TRANSLATOR_FAILED",
            Error::TranslatorTimeout(_) => "TRANSLATOR_TIMEOUT",
            Error::EmptyTranslation => "EMPTY_TRANSLATION",
            Error::QueryRejected(_) => "QUERY_REJECTED",
            Error::Execution(_) => "EXECUTION_FAILED",
            Error::ExecutionTimeout(_) => "EXECUTION_TIMEOUT",
            Error::Database(_) => "ENGINE_ERROR",
        }
    }

    /// Error text without the code prefix, for client-facing details.
    pub fn detail(&self) -> String {
        match self {
            Error::InvalidInput(msg)
            | Error::StoreFetch(msg)
            | Error::StoreTimeout(msg)
            | Error::TranslatorFailed(msg)
            | Error::TranslatorTimeout(msg)
            | Error::QueryRejected(msg)
            | Error::Execution(msg) => msg.clone(),
            Error::EmptyTranslation => "translator returned no query text".to_string(),
            Error::ExecutionTimeout(ms) => format!("query exceeded {ms}ms"),
            Error::Database(e) => e.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
