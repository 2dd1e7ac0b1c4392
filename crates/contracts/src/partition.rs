//! Partition path scheme
//!
//! `root/tenant={t}/device={d}/date={yyyy-MM-dd}/hour={HH}/telemetry_{yyyyMMdd_HHmm}.<ext>`
//!
//! Must be reproduced bit-for-bit for compatibility with existing stores.
//! Staging logs, segments and index sidecars share the scheme under their own
//! root directories, differing only in extension.

use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;

use crate::BucketKey;

/// Extension of staging log files.
pub const STAGING_EXT: &str = "jsonl";
/// Extension of compacted columnar segment files.
pub const SEGMENT_EXT: &str = "seg";
/// Extension of index sidecar files.
pub const INDEX_EXT: &str = "idx";

const FILE_PREFIX: &str = "telemetry_";
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M";

/// File name (no directories) for a bucket with the given extension.
pub fn partition_file_name(key: &BucketKey, ext: &str) -> String {
    format!(
        "{FILE_PREFIX}{}.{ext}",
        key.bucket_start.format(FILE_STAMP_FORMAT)
    )
}

/// Full partition path for a bucket under `root`.
pub fn partition_path(root: &Path, key: &BucketKey, ext: &str) -> PathBuf {
    root.join(format!("tenant={}", key.tenant_id))
        .join(format!("device={}", key.device_id))
        .join(format!("date={}", key.bucket_start.format("%Y-%m-%d")))
        .join(format!("hour={}", key.bucket_start.format("%H")))
        .join(partition_file_name(key, ext))
}

/// Staging log path for a bucket.
pub fn staging_path(root: &Path, key: &BucketKey) -> PathBuf {
    partition_path(root, key, STAGING_EXT)
}

/// Columnar segment path for a bucket.
pub fn segment_path(root: &Path, key: &BucketKey) -> PathBuf {
    partition_path(root, key, SEGMENT_EXT)
}

/// Index sidecar path for a bucket.
pub fn index_path(root: &Path, key: &BucketKey) -> PathBuf {
    partition_path(root, key, INDEX_EXT)
}

/// Recover the bucket key encoded in a partition path.
///
/// Returns None when the path does not follow the scheme; callers treat that
/// as a foreign file and skip it.
pub fn parse_partition_path(root: &Path, path: &Path) -> Option<BucketKey> {
    let rel = path.strip_prefix(root).ok()?;
    let mut tenant_id = None;
    let mut device_id = None;
    let mut stamp = None;

    for component in rel.components() {
        let Component::Normal(part) = component else {
            return None;
        };
        let part = part.to_str()?;
        if let Some(t) = part.strip_prefix("tenant=") {
            tenant_id = Some(t.to_string());
        } else if let Some(d) = part.strip_prefix("device=") {
            device_id = Some(d.to_string());
        } else if let Some(rest) = part.strip_prefix(FILE_PREFIX) {
            let stem = rest.split('.').next()?;
            stamp = NaiveDateTime::parse_from_str(stem, FILE_STAMP_FORMAT).ok();
        }
    }

    Some(BucketKey {
        tenant_id: tenant_id?,
        device_id: device_id?,
        bucket_start: stamp?.and_utc(),
    })
}
