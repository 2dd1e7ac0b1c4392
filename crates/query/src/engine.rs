//! Bucket-walking scan with index pruning

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use contracts::{
    index_path, segment_path, truncate_to_bucket, BucketKey, EventType, QueryConfig,
    StageRecord, StorageConfig,
};
use serde::Serialize;
use storage::{read_index_entry, read_segment};
use tracing::{debug, instrument, warn};

use crate::error::{QueryError, Result};

/// One range scan over a single `(tenant, device)` series.
///
/// The window is half-open: rows with `from <= occurred_at < to`.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub tenant_id: String,
    pub device_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Restrict to one point when set
    pub point_id: Option<String>,
    /// Row cap; falls back to the configured default when absent
    pub limit: Option<usize>,
}

/// One matching record, in segment row order within each bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRow {
    pub tenant_id: String,
    pub device_id: String,
    pub point_id: String,
    pub sequence: i64,
    pub occurred_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl From<StageRecord> for QueryRow {
    fn from(record: StageRecord) -> Self {
        Self {
            tenant_id: record.tenant_id,
            device_id: record.device_id,
            point_id: record.point_id,
            sequence: record.sequence,
            occurred_at: record.occurred_at,
            ingested_at: record.ingested_at,
            event_type: record.event_type,
            value_json: record.value_json,
            payload_json: record.payload_json,
            tags: record.tags,
        }
    }
}

/// Read path over compacted buckets.
///
/// Only sees data that compaction has already turned into segments; records
/// still sitting in staging logs are invisible until the next sweep.
pub struct QueryEngine {
    segment_root: PathBuf,
    index_root: PathBuf,
    bucket_minutes: u32,
    default_limit: usize,
}

impl QueryEngine {
    pub fn new(storage: &StorageConfig, query: &QueryConfig) -> Self {
        Self {
            segment_root: storage.segment_root.clone(),
            index_root: storage.index_root.clone(),
            bucket_minutes: storage.bucket_minutes,
            default_limit: query.default_limit,
        }
    }

    /// Run one scan.
    ///
    /// Buckets are visited in chronological order; each index sidecar is
    /// consulted before its segment is opened, and a pruned bucket's segment
    /// is never read. An unreadable sidecar only skips its own bucket.
    #[instrument(
        name = "query_execute",
        skip(self, request),
        fields(tenant = %request.tenant_id, device = %request.device_id)
    )]
    pub async fn execute(&self, request: &QueryRequest) -> Result<Vec<QueryRow>> {
        if request.from >= request.to {
            return Err(QueryError::InvalidRange {
                from: request.from,
                to: request.to,
            });
        }
        ::metrics::counter!("pointlake_queries_total").increment(1);

        let limit = request.limit.unwrap_or(self.default_limit);
        let mut rows = Vec::new();
        if limit == 0 {
            return Ok(rows);
        }

        // Walk the bucket grid covering the window. The last bucket is the
        // one containing `to`: late records staged there can still carry an
        // occurred_at inside the window.
        let step = Duration::minutes(i64::from(self.bucket_minutes.max(1)));
        let mut bucket_start = truncate_to_bucket(request.from, self.bucket_minutes);
        let last = truncate_to_bucket(request.to, self.bucket_minutes);

        while bucket_start <= last {
            let key = BucketKey {
                tenant_id: request.tenant_id.clone(),
                device_id: request.device_id.clone(),
                bucket_start,
            };
            bucket_start += step;

            if !self.scan_bucket(&key, request, limit, &mut rows).await? {
                break;
            }
        }

        debug!(rows = rows.len(), "query done");
        Ok(rows)
    }

    /// Scan one bucket; returns false once the limit is reached.
    async fn scan_bucket(
        &self,
        key: &BucketKey,
        request: &QueryRequest,
        limit: usize,
        rows: &mut Vec<QueryRow>,
    ) -> Result<bool> {
        let idx = index_path(&self.index_root, key);
        if !idx.exists() {
            // Never compacted, or no data for this series in the window
            return Ok(true);
        }
        let entry = match read_index_entry(&idx).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %idx.display(), error = %e, "skipping unreadable index sidecar");
                return Ok(true);
            }
        };

        if !entry.overlaps(request.from, request.to) {
            ::metrics::counter!("pointlake_buckets_pruned_total").increment(1);
            return Ok(true);
        }
        if let Some(point_id) = &request.point_id {
            if !entry.may_contain_point(point_id) {
                ::metrics::counter!("pointlake_buckets_pruned_total").increment(1);
                return Ok(true);
            }
        }

        // The sidecar names the segment file; the directory follows the
        // partition scheme
        let seg = segment_path(&self.segment_root, key).with_file_name(&entry.segment_file);
        let columns = read_segment(&seg).await?;
        ::metrics::counter!("pointlake_segments_scanned_total").increment(1);

        for i in 0..columns.len() {
            let record = columns.record(i)?;
            if record.tenant_id != request.tenant_id || record.device_id != request.device_id {
                continue;
            }
            if record.occurred_at < request.from || record.occurred_at >= request.to {
                continue;
            }
            if let Some(point_id) = &request.point_id {
                if &record.point_id != point_id {
                    continue;
                }
            }
            rows.push(QueryRow::from(record));
            if rows.len() >= limit {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
