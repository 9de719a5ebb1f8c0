//! The per-request ask flow.
//!
//! snapshot → instruction brief → translator → sanitizer/executor. Every
//! failure is recorded in the activity log before it is returned.

use std::sync::Arc;

use crate::Error;
use crate::activity::{ActivityLog, LogCategory};
use crate::cache::SnapshotCache;
use crate::prompt::build_instructions_for;
use crate::query::{QueryExecutor, Row, strip_fences};
use crate::translator::Translator;

/// Successful outcome of one question.
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// The query ran; `sql` is the translator's query as shown to the user.
    Answered { rows: Vec<Row>, sql: String },
    /// The store holds no usable rows, so nothing was translated.
    EmptyDataset,
}

/// Wires the cache, translator and executor together for one service.
pub struct AskPipeline {
    cache: Arc<SnapshotCache>,
    translator: Arc<dyn Translator>,
    executor: QueryExecutor,
    log: Arc<ActivityLog>,
}

impl AskPipeline {
    pub fn new(
        cache: Arc<SnapshotCache>, translator: Arc<dyn Translator>, executor: QueryExecutor, log: Arc<ActivityLog>,
    ) -> Self {
        Self { cache, translator, executor, log }
    }

    pub fn log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Answer a natural-language question.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank question; otherwise whatever the store,
    /// translator, sanitizer, or engine reported. The error is logged under
    /// `ERROR` before it is returned.
    pub async fn ask(&self, question: &str) -> Result<AskOutcome, Error> {
        match self.answer(question).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.log
                    .record(LogCategory::Error, format!("Request failed: {}", err.code()), Some(err.detail()));
                Err(err)
            }
        }
    }

    async fn answer(&self, question: &str) -> Result<AskOutcome, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Question is required".into()));
        }

        self.log.record(LogCategory::Query, format!("Received question: \"{question}\""), None);

        let snapshot = self.cache.get_snapshot().await?;
        if snapshot.is_empty() {
            self.log.record(LogCategory::Warn, "No valid data found in DB", None);
            return Ok(AskOutcome::EmptyDataset);
        }

        let instructions = build_instructions_for(&snapshot, self.executor.table());
        let raw = self.translator.translate(&instructions, question).await?;
        if raw.trim().is_empty() {
            return Err(Error::EmptyTranslation);
        }

        self.log.record(
            LogCategory::Llm,
            format!("Generated SQL (Default Year: {})", snapshot.latest_period),
            Some(strip_fences(&raw)),
        );

        self.log.record(LogCategory::Exec, "Executing SQL...", None);
        let output = self.executor.execute(&raw, &snapshot).await?;

        self.log.record(LogCategory::Result, format!("Returned {} rows", output.rows.len()), None);

        Ok(AskOutcome::Answered { rows: output.rows, sql: output.sql })
    }
}
