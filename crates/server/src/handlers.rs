//! HTTP request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tradex_core::{AskOutcome, AskPipeline, LogEntry, Row};

use crate::error::ApiError;

/// Message returned when the store holds no usable rows.
pub const EMPTY_DATASET_MESSAGE: &str = "No valid data found in database.";

/// Application state shared across handlers.
pub struct AppState {
    pub pipeline: Arc<AskPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<AskPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Ask request. A missing `question` is treated like a blank one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: Vec<Row>,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<AskOutcome> for AskResponse {
    fn from(outcome: AskOutcome) -> Self {
        match outcome {
            AskOutcome::Answered { rows, sql } => Self { answer: rows, sql, message: None },
            AskOutcome::EmptyDataset => {
                Self { answer: Vec::new(), sql: String::new(), message: Some(EMPTY_DATASET_MESSAGE.to_string()) }
            }
        }
    }
}

/// GET / - liveness banner.
pub async fn root_handler() -> &'static str {
    "TradeXchange API is running"
}

/// POST {prefix}/ask - answer a natural-language question.
pub async fn ask_handler(
    State(state): State<Arc<AppState>>, payload: Option<Json<AskRequest>>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = payload.and_then(|Json(req)| req.question).unwrap_or_default();
    let outcome = state.pipeline.ask(&question).await?;
    Ok(Json(outcome.into()))
}

/// GET {prefix}/logs - activity log, newest first.
pub async fn logs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(state.pipeline.log().read_all())
}
