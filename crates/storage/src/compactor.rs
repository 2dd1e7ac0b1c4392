//! Staging-to-segment compactor
//!
//! Periodically sweeps the staging root and rewrites every staging log into
//! a columnar segment plus index sidecar, deleting the log afterwards. The
//! write order is segment, then index, then delete; a crash mid-sequence
//! leaves the staging log in place and the next sweep overwrites both
//! outputs from it.
//!
//! Records appended to a bucket after its log was compacted land in a fresh
//! log under the same path and are folded in by a later sweep, replacing the
//! bucket's segment and sidecar.

use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{
    parse_partition_path, partition_file_name, segment_path, BucketKey, StageRecord,
    StorageConfig, SEGMENT_EXT, STAGING_EXT,
};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::{Result, StorageError};
use crate::index::{build_index_entry, write_index_entry};
use crate::segment::{write_segment, SegmentColumns};

/// Floor for the sweep interval; smaller configured values are clamped.
pub const MIN_COMPACTION_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one sweep over the staging root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    /// Staging logs rewritten into segments
    pub files_compacted: usize,
    /// Records moved into segments
    pub records_compacted: usize,
    /// Empty staging logs removed without producing a segment
    pub empty_deleted: usize,
    /// Staging logs left in place after an error
    pub failures: usize,
}

pub struct Compactor {
    staging_root: PathBuf,
    segment_root: PathBuf,
    index_root: PathBuf,
    interval: Duration,
}

impl Compactor {
    pub fn new(config: &StorageConfig) -> Self {
        let configured = Duration::from_secs(config.compaction_interval_secs);
        let interval = if configured < MIN_COMPACTION_INTERVAL {
            warn!(
                configured_secs = config.compaction_interval_secs,
                "compaction interval below floor, clamping to 1s"
            );
            MIN_COMPACTION_INTERVAL
        } else {
            configured
        };
        Self {
            staging_root: config.staging_root.clone(),
            segment_root: config.segment_root.clone(),
            index_root: config.index_root.clone(),
            interval,
        }
    }

    /// Effective sweep interval after floor clamping.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One full sweep of the staging root.
    #[instrument(name = "compaction_sweep", skip(self))]
    pub async fn run_once(&self) -> CompactionReport {
        let mut report = CompactionReport::default();

        for path in self.staged_logs() {
            let Some(key) = parse_partition_path(&self.staging_root, &path) else {
                debug!(path = %path.display(), "skipping foreign file in staging root");
                continue;
            };
            match self.compact_log(&path, &key).await {
                Ok(0) => report.empty_deleted += 1,
                Ok(records) => {
                    report.files_compacted += 1;
                    report.records_compacted += records;
                }
                Err(e) => {
                    // Log stays in place; retried next sweep
                    report.failures += 1;
                    warn!(path = %path.display(), error = %e, "compaction failed for staging log");
                    ::metrics::counter!("pointlake_compaction_failures_total").increment(1);
                }
            }
        }

        if report != CompactionReport::default() {
            info!(
                files = report.files_compacted,
                records = report.records_compacted,
                empty = report.empty_deleted,
                failures = report.failures,
                "compaction sweep done"
            );
        }
        ::metrics::counter!("pointlake_segments_compacted_total")
            .increment(report.files_compacted as u64);
        ::metrics::counter!("pointlake_records_compacted_total")
            .increment(report.records_compacted as u64);
        report
    }

    /// Staging logs in deterministic order.
    fn staged_logs(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.staging_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_log = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == STAGING_EXT);
            if is_log && entry.file_type().is_file() {
                files.push(path.to_path_buf());
            }
        }
        files
    }

    /// Compact one staging log; returns the number of records moved.
    ///
    /// The log is deleted only after both the segment and the index sidecar
    /// are durably written.
    async fn compact_log(&self, log_path: &Path, key: &BucketKey) -> Result<usize> {
        let content = tokio::fs::read_to_string(log_path).await?;
        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match StageRecord::from_line(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        path = %log_path.display(),
                        error = %e,
                        "dropping unparseable staging line"
                    );
                }
            }
        }

        if records.is_empty() {
            tokio::fs::remove_file(log_path).await?;
            debug!(path = %log_path.display(), "removed empty staging log");
            return Ok(0);
        }

        let seg_path = segment_path(&self.segment_root, key);
        let idx_path = contracts::index_path(&self.index_root, key);
        let segment_file = partition_file_name(key, SEGMENT_EXT);

        let columns = SegmentColumns::from_records(&records)?;
        write_segment(&seg_path, &columns).await?;

        let entry = build_index_entry(key, &records, segment_file)
            .ok_or_else(|| StorageError::compaction(log_path, "no records to index"))?;
        write_index_entry(&idx_path, &entry).await?;

        tokio::fs::remove_file(log_path).await?;
        debug!(
            staging = %log_path.display(),
            segment = %seg_path.display(),
            records = records.len(),
            "bucket compacted"
        );
        Ok(records.len())
    }
}
