//! Append-only JSONL staging logs
//!
//! Every batch is split by bucket key and appended to the bucket's staging
//! log as one line per record. Appends to the same log are serialized by a
//! per-path mutex so lines from concurrent batches never interleave.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use contracts::{staging_path, BucketKey, EventEnvelope, StageRecord};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};

/// Writes event batches into bucket-partitioned staging logs.
///
/// Records are assigned to buckets by `ingested_at`; `occurred_at` only
/// matters at query time. Safe to share behind an `Arc` across sinks.
pub struct StagingWriter {
    root: PathBuf,
    bucket_minutes: u32,
    // Lazily created, never removed; the set of live buckets is small
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl StagingWriter {
    pub fn new(root: impl Into<PathBuf>, bucket_minutes: u32) -> Self {
        Self {
            root: root.into(),
            bucket_minutes,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append a batch, one staging log per bucket touched.
    ///
    /// Returns the number of records written. A failure on one bucket's log
    /// aborts the batch; records already appended to other logs stay put and
    /// are not rolled back.
    #[instrument(name = "staging_write", skip(self, batch), fields(records = batch.len()))]
    pub async fn write_batch(&self, batch: &[EventEnvelope]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut groups: HashMap<BucketKey, Vec<StageRecord>> = HashMap::new();
        for envelope in batch {
            let key = BucketKey::for_record(
                &envelope.message.tenant_id,
                &envelope.message.device_id,
                envelope.ingested_at,
                self.bucket_minutes,
            );
            groups.entry(key).or_default().push(envelope.to_stage_record()?);
        }

        let mut written = 0usize;
        for (key, records) in groups {
            let path = staging_path(&self.root, &key);
            self.append_lines(&path, &records).await?;
            written += records.len();
        }
        Ok(written)
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn append_lines(&self, path: &Path, records: &[StageRecord]) -> Result<()> {
        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&record.to_line()?);
            buffer.push('\n');
        }

        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StorageError::staging_write(path, e.to_string()))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| StorageError::staging_write(path, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| StorageError::staging_write(path, e.to_string()))?;

        debug!(path = %path.display(), records = records.len(), "staged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{PointMessage, PointValue};

    fn envelope(device: &str, minute: u32, sequence: i64) -> EventEnvelope {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        EventEnvelope::telemetry(
            PointMessage {
                tenant_id: "t1".to_string(),
                building_name: "hq".to_string(),
                space_id: "s1".to_string(),
                device_id: device.to_string(),
                point_id: "p1".to_string(),
                sequence,
                occurred_at: at,
                value: PointValue::Number(sequence as f64),
            },
            at,
        )
    }

    #[tokio::test]
    async fn test_groups_by_bucket_and_device() {
        let dir = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(dir.path(), 15);

        // d1 spans two buckets; d2 shares the first bucket window
        let batch = vec![
            envelope("d1", 1, 0),
            envelope("d1", 5, 1),
            envelope("d1", 20, 2),
            envelope("d2", 3, 0),
        ];
        assert_eq!(writer.write_batch(&batch).await.unwrap(), 4);

        let d1_first = dir
            .path()
            .join("tenant=t1/device=d1/date=2024-05-01/hour=12/telemetry_20240501_1200.jsonl");
        let d1_second = dir
            .path()
            .join("tenant=t1/device=d1/date=2024-05-01/hour=12/telemetry_20240501_1215.jsonl");
        let d2_first = dir
            .path()
            .join("tenant=t1/device=d2/date=2024-05-01/hour=12/telemetry_20240501_1200.jsonl");

        let content = std::fs::read_to_string(&d1_first).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(
            std::fs::read_to_string(&d1_second).unwrap().lines().count(),
            1
        );
        assert_eq!(
            std::fs::read_to_string(&d2_first).unwrap().lines().count(),
            1
        );

        // Each line parses back into a StageRecord
        for line in content.lines() {
            StageRecord::from_line(line).unwrap();
        }
    }

    #[tokio::test]
    async fn test_append_is_cumulative() {
        let dir = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(dir.path(), 15);

        writer.write_batch(&[envelope("d1", 1, 0)]).await.unwrap();
        writer.write_batch(&[envelope("d1", 2, 1)]).await.unwrap();

        let path = dir
            .path()
            .join("tenant=t1/device=d1/date=2024-05-01/hour=12/telemetry_20240501_1200.jsonl");
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(StagingWriter::new(dir.path(), 15));

        let mut tasks = Vec::new();
        for task_id in 0..8 {
            let writer = writer.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..10 {
                    let batch = vec![envelope("d1", 1, task_id * 100 + i)];
                    writer.write_batch(&batch).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let path = dir
            .path()
            .join("tenant=t1/device=d1/date=2024-05-01/hour=12/telemetry_20240501_1200.jsonl");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 80);
        for line in content.lines() {
            StageRecord::from_line(line).unwrap();
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let writer = StagingWriter::new(dir.path(), 15);
        assert_eq!(writer.write_batch(&[]).await.unwrap(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
