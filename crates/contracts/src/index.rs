//! IndexEntry - per-bucket pruning sidecar

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata written once per successfully compacted bucket.
///
/// Used exclusively for query-time skip/no-skip decisions, never for
/// correctness of values. Immutable; deleted only with its segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub tenant_id: String,
    pub device_id: String,
    pub bucket_start: DateTime<Utc>,
    pub min_occurred_at: DateTime<Utc>,
    pub max_occurred_at: DateTime<Utc>,
    pub record_count: u64,
    /// Distinct point ids in the segment, sorted for determinism
    pub point_ids: Vec<String>,
    /// File name (not path) of the segment this entry describes
    pub segment_file: String,
}

impl IndexEntry {
    /// True when `[min_occurred_at, max_occurred_at]` intersects `[from, to)`.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.max_occurred_at >= from && self.min_occurred_at < to
    }

    /// True when a `point_id` filter cannot rule this bucket out.
    ///
    /// An empty distinct set means the set is unknown and must not prune.
    pub fn may_contain_point(&self, point_id: &str) -> bool {
        self.point_ids.is_empty() || self.point_ids.iter().any(|p| p == point_id)
    }
}
