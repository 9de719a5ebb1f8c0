//! Snapshot type and the freshness-bounded cache around it.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::Error;
use crate::activity::{ActivityLog, LogCategory};
use crate::dataset::{DatasetSource, Normalized, Record, normalize};

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// The normalized dataset as of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
    /// Maximum `year` across `records`, computed when the snapshot was built.
    pub latest_period: i64,
    /// Rows the normalizer excluded.
    pub dropped: usize,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(normalized: Normalized, fetched_at: DateTime<Utc>) -> Self {
        Self {
            records: normalized.records,
            latest_period: normalized.latest_period,
            dropped: normalized.dropped,
            fetched_at,
        }
    }

    /// Build a snapshot directly from records, recomputing the latest period.
    pub fn from_records(records: Vec<Record>) -> Self {
        let latest_period = records.iter().map(|r| r.year).max().unwrap_or(0);
        Self { records, latest_period, dropped: 0, fetched_at: Utc::now() }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Distinct non-zero periods present, ascending.
    pub fn periods(&self) -> Vec<i64> {
        self.records
            .iter()
            .map(|r| r.year)
            .filter(|year| *year != 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    loaded_at: Instant,
}

/// Freshness-bounded cache in front of a [`DatasetSource`].
///
/// Readers never observe a partially built snapshot: entries are swapped as
/// a whole behind a lock that is never held across an await point.
pub struct SnapshotCache {
    source: Arc<dyn DatasetSource>,
    log: Arc<ActivityLog>,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    refresh: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn DatasetSource>, log: Arc<ActivityLog>, ttl: Duration) -> Self {
        Self { source, log, ttl, entry: RwLock::new(None), refresh: Mutex::new(()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached snapshot, refreshing it from the store when stale.
    ///
    /// # Errors
    ///
    /// Propagates the store error when a refresh is needed and fails. The
    /// previous entry, if any, stays in place.
    pub async fn get_snapshot(&self) -> Result<Arc<Snapshot>, Error> {
        if let Some(snapshot) = self.fresh() {
            self.log.record(LogCategory::Cache, "Serving data from cache", None);
            return Ok(snapshot);
        }

        let _refresh = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(snapshot) = self.fresh() {
            self.log.record(LogCategory::Cache, "Serving data from cache", None);
            return Ok(snapshot);
        }

        self.log.record(LogCategory::Db, "Fetching fresh data from store...", None);
        let rows = self.source.fetch_rows().await?;
        let raw_count = rows.len();

        let snapshot = Arc::new(Snapshot::new(normalize(rows), Utc::now()));

        if snapshot.latest_period > 0 {
            self.log.record(
                LogCategory::System,
                format!("Detected latest data year from DB: {}", snapshot.latest_period),
                None,
            );
        }
        if snapshot.dropped > 0 {
            self.log.record(
                LogCategory::Warn,
                format!("Dropped {} of {} rows without a usable lpi_score", snapshot.dropped, raw_count),
                None,
            );
        }

        self.store(Arc::clone(&snapshot));

        self.log.record(
            LogCategory::Data,
            format!("Data prepared. Rows: {}. Latest Year: {}", snapshot.len(), snapshot.latest_period),
            None,
        );

        Ok(snapshot)
    }

    /// Current entry regardless of freshness.
    pub fn cached(&self) -> Option<Arc<Snapshot>> {
        self.read().as_ref().map(|e| Arc::clone(&e.snapshot))
    }

    /// Drop the current entry so the next call refreshes.
    pub fn invalidate(&self) {
        *self.write() = None;
    }

    fn fresh(&self) -> Option<Arc<Snapshot>> {
        self.read()
            .as_ref()
            .filter(|e| e.loaded_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.snapshot))
    }

    fn store(&self, snapshot: Arc<Snapshot>) {
        *self.write() = Some(CacheEntry { snapshot, loaded_at: Instant::now() });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<CacheEntry>> {
        self.entry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<CacheEntry>> {
        self.entry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
