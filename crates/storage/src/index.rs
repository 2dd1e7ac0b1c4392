//! Index sidecar persistence

use std::collections::BTreeSet;
use std::path::Path;

use contracts::{BucketKey, IndexEntry, StageRecord};

use crate::error::Result;

/// Summarize a bucket's records into its index entry.
///
/// Min/max are over `occurred_at`, not the bucket window; late or early
/// records widen the range beyond the bucket bounds. Returns None for an
/// empty record set, which never produces a segment.
pub fn build_index_entry(
    key: &BucketKey,
    records: &[StageRecord],
    segment_file: impl Into<String>,
) -> Option<IndexEntry> {
    let first = records.first()?;
    let mut min_occurred_at = first.occurred_at;
    let mut max_occurred_at = first.occurred_at;
    let mut point_ids = BTreeSet::new();
    for record in records {
        min_occurred_at = min_occurred_at.min(record.occurred_at);
        max_occurred_at = max_occurred_at.max(record.occurred_at);
        point_ids.insert(record.point_id.clone());
    }
    Some(IndexEntry {
        tenant_id: key.tenant_id.clone(),
        device_id: key.device_id.clone(),
        bucket_start: key.bucket_start,
        min_occurred_at,
        max_occurred_at,
        record_count: records.len() as u64,
        point_ids: point_ids.into_iter().collect(),
        segment_file: segment_file.into(),
    })
}

/// Write an index sidecar as a single JSON document.
pub async fn write_index_entry(path: &Path, entry: &IndexEntry) -> Result<()> {
    let bytes = serde_json::to_vec(entry)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Read an index sidecar back.
pub async fn read_index_entry(path: &Path) -> Result<IndexEntry> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
