//! In-memory snapshot cache for the LPI dataset.
//!
//! This module keeps one normalized [`Snapshot`] of the store and serves it
//! while it is fresh. It supports:
//!
//! - A fixed freshness window (5 minutes by default)
//! - Single-flight refresh: concurrent callers on a stale cache share one store read
//! - Wholesale replacement; a failed refresh never disturbs the previous entry

pub mod snapshot;

pub use snapshot::{DEFAULT_TTL, Snapshot, SnapshotCache};
