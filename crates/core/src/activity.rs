//! Bounded activity log of pipeline events.
//!
//! Entries are immutable once recorded. The newest entry sits at the head;
//! once capacity is reached the oldest entry is evicted on each insert.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of retained entries.
pub const DEFAULT_CAPACITY: usize = 50;

/// Event category, serialized in upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogCategory {
    System,
    Cache,
    Db,
    Data,
    Query,
    Llm,
    Exec,
    Result,
    Warn,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::System => "SYSTEM",
            LogCategory::Cache => "CACHE",
            LogCategory::Db => "DB",
            LogCategory::Data => "DATA",
            LogCategory::Query => "QUERY",
            LogCategory::Llm => "LLM",
            LogCategory::Exec => "EXEC",
            LogCategory::Result => "RESULT",
            LogCategory::Warn => "WARN",
            LogCategory::Error => "ERROR",
        }
    }
}

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub category: LogCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Process-wide ring buffer of [`LogEntry`] values.
///
/// Construct one per service and share it behind an `Arc`.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    /// Create an empty log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: Mutex::new(VecDeque::with_capacity(capacity)), next_id: AtomicU64::new(1), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry at the head, evicting the oldest when full.
    ///
    /// The entry is also emitted as a tracing event.
    pub fn record(&self, category: LogCategory, message: impl Into<String>, details: Option<String>) {
        let message = message.into();

        match category {
            LogCategory::Error => {
                tracing::error!(category = category.as_str(), details = details.as_deref(), "{}", message)
            }
            LogCategory::Warn => tracing::warn!(category = category.as_str(), "{}", message),
            _ => tracing::info!(category = category.as_str(), "{}", message),
        }

        let mut entries = self.lock();
        let entry = LogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            category,
            message,
            details,
        };
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Copy of all entries, newest first.
    pub fn read_all(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Ids keep increasing across clears.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
