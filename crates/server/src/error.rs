//! HTTP error responses.
//!
//! Every failure leaves the service as `{error, code?, details?}` with a status
//! chosen by the failing stage.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tradex_core::Error;

/// Request failure carried to the HTTP layer.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::QueryRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::StoreFetch(_) | Error::TranslatorFailed(_) | Error::EmptyTranslation => StatusCode::BAD_GATEWAY,
            Error::StoreTimeout(_) | Error::TranslatorTimeout(_) | Error::ExecutionTimeout(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Error::Execution(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match &self.0 {
            Error::InvalidInput(msg) => ErrorBody { error: msg.clone(), code: None, details: None },
            other => ErrorBody {
                error: self.status().canonical_reason().unwrap_or("Internal Server Error").to_string(),
                code: Some(other.code()),
                details: Some(other.detail()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidInput("Question is required".into()), StatusCode::BAD_REQUEST),
            (Error::QueryRejected("DROP".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (Error::StoreFetch("down".into()), StatusCode::BAD_GATEWAY),
            (Error::TranslatorFailed("503".into()), StatusCode::BAD_GATEWAY),
            (Error::EmptyTranslation, StatusCode::BAD_GATEWAY),
            (Error::StoreTimeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (Error::TranslatorTimeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (Error::ExecutionTimeout(5000), StatusCode::GATEWAY_TIMEOUT),
            (Error::Execution("no such column: x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn test_invalid_input_body_has_no_details() {
        let body = ApiError(Error::InvalidInput("Question is required".into())).body();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"error": "Question is required"})
        );
    }

    #[test]
    fn test_failure_body_carries_details() {
        let body = ApiError(Error::Execution("no such column: score".into())).body();
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.code, Some("EXECUTION_FAILED"));
        assert_eq!(body.details.as_deref(), Some("no such column: score"));

        let body = ApiError(Error::StoreTimeout("slow".into())).body();
        assert_eq!(body.error, "Gateway Timeout");
    }
}
