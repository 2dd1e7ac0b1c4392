//! TelemetryBucket - fixed-width time partition key

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Partition key `(tenant, device, bucket_start)`.
///
/// All records whose assigned timestamp falls in
/// `[bucket_start, bucket_start + granularity)` share one staging log and
/// one segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub tenant_id: String,
    pub device_id: String,
    pub bucket_start: DateTime<Utc>,
}

impl BucketKey {
    /// Build the key a record belongs to at the given granularity.
    pub fn for_record(
        tenant_id: &str,
        device_id: &str,
        at: DateTime<Utc>,
        granularity_minutes: u32,
    ) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            device_id: device_id.to_string(),
            bucket_start: truncate_to_bucket(at, granularity_minutes),
        }
    }

    /// Exclusive end of this bucket.
    pub fn bucket_end(&self, granularity_minutes: u32) -> DateTime<Utc> {
        self.bucket_start + Duration::minutes(i64::from(granularity_minutes.max(1)))
    }
}

/// Truncate a timestamp down to its bucket start: the greatest
/// multiple-of-`granularity_minutes` minute mark not after `at`.
pub fn truncate_to_bucket(at: DateTime<Utc>, granularity_minutes: u32) -> DateTime<Utc> {
    let g = i64::from(granularity_minutes.max(1)) * 60;
    let secs = at.timestamp();
    let start = secs - secs.rem_euclid(g);
    DateTime::<Utc>::from_timestamp(start, 0).unwrap_or(at)
}
