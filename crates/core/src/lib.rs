//! Core of the trade-data question service.
//!
//! This crate provides:
//! - Dataset normalization and the TTL snapshot cache
//! - The translator instruction brief
//! - Query sanitizing and sandboxed execution
//! - The bounded activity log
//! - Unified error types and layered configuration

pub mod activity;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod query;
pub mod translator;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activity::{ActivityLog, LogCategory, LogEntry};
pub use cache::{Snapshot, SnapshotCache};
pub use config::{AppConfig, ConfigError};
pub use dataset::{DatasetSource, RawRecord, Record};
pub use error::Error;
pub use pipeline::{AskOutcome, AskPipeline};
pub use query::{QueryExecutor, Row};
pub use translator::Translator;
