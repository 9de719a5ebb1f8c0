//! Typed LPI records and the collaborators that supply raw rows.
//!
//! The store hands back loosely typed JSON objects. [`normalize`] turns them
//! into [`Record`]s, dropping rows whose score cannot be used and discovering
//! the latest period present.

pub mod normalize;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

pub use normalize::{Normalized, normalize, parse_lpi_score, parse_year, title_case};

/// A raw row exactly as the store returned it.
pub type RawRecord = serde_json::Map<String, Value>;

/// Sentinel used when a text field is absent or blank.
pub const UNKNOWN: &str = "Unknown";

/// A cleaned row of the LPI dataset.
///
/// Every record in a snapshot has a finite, in-range `lpi_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier, passed through from the store.
    pub id: Value,
    pub country: String,
    pub region: String,
    pub lpi_score: f64,
    /// Period identifier; `0` when the source value could not be parsed.
    pub year: i64,
}

/// Read-only access to the durable store.
///
/// One call reads every row of the logical table; no paging or filtering.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<RawRecord>, Error>;
}
