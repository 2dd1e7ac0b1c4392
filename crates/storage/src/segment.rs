//! Columnar segment codec
//!
//! A segment is the immutable columnar form of one bucket: a 4-byte magic,
//! then a bincode-encoded versioned struct of parallel column vectors. All
//! columns have the same length; row `i` of every column belongs to the same
//! record. Timestamps are stored as microseconds since the Unix epoch.

use std::path::Path;

use chrono::DateTime;
use contracts::{EventType, StageRecord};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Leading bytes of every segment file.
pub const SEGMENT_MAGIC: [u8; 4] = *b"PLS1";

/// Current on-disk schema version.
pub const SEGMENT_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct SegmentFile {
    version: u16,
    columns: SegmentColumns,
}

/// Struct-of-arrays column store for one bucket.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentColumns {
    pub tenant_id: Vec<String>,
    pub building_name: Vec<String>,
    pub space_id: Vec<String>,
    pub device_id: Vec<String>,
    pub point_id: Vec<String>,
    pub sequence: Vec<i64>,
    pub occurred_at_micros: Vec<i64>,
    pub ingested_at_micros: Vec<i64>,
    pub event_type: Vec<i32>,
    pub severity: Vec<Option<i32>>,
    pub value_json: Vec<Option<String>>,
    pub payload_json: Vec<Option<String>>,
    pub tags_json: Vec<Option<String>>,
}

impl SegmentColumns {
    /// Pivot staged rows into columns, preserving input order.
    pub fn from_records(records: &[StageRecord]) -> Result<Self> {
        let mut columns = Self::default();
        for record in records {
            columns.tenant_id.push(record.tenant_id.clone());
            columns.building_name.push(record.building_name.clone());
            columns.space_id.push(record.space_id.clone());
            columns.device_id.push(record.device_id.clone());
            columns.point_id.push(record.point_id.clone());
            columns.sequence.push(record.sequence);
            columns
                .occurred_at_micros
                .push(record.occurred_at.timestamp_micros());
            columns
                .ingested_at_micros
                .push(record.ingested_at.timestamp_micros());
            columns.event_type.push(record.event_type.as_i32());
            columns.severity.push(record.severity);
            columns.value_json.push(record.value_json.clone());
            columns.payload_json.push(record.payload_json.clone());
            let tags_json = match &record.tags {
                Some(tags) => Some(serde_json::to_string(tags)?),
                None => None,
            };
            columns.tags_json.push(tags_json);
        }
        Ok(columns)
    }

    pub fn len(&self) -> usize {
        self.point_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point_id.is_empty()
    }

    /// Rebuild row `i` as a StageRecord.
    ///
    /// Fails on out-of-range timestamps, unknown event type codes or
    /// unparseable tag text; those only arise from a corrupt file.
    pub fn record(&self, i: usize) -> Result<StageRecord> {
        let corrupt = |message: &str| StorageError::corrupt_segment("<memory>", message);

        if i >= self.len() {
            return Err(corrupt(&format!("row {i} out of range")));
        }
        let occurred_at = DateTime::from_timestamp_micros(self.occurred_at_micros[i])
            .ok_or_else(|| corrupt("occurredAt out of range"))?;
        let ingested_at = DateTime::from_timestamp_micros(self.ingested_at_micros[i])
            .ok_or_else(|| corrupt("ingestedAt out of range"))?;
        let event_type = EventType::from_i32(self.event_type[i])
            .ok_or_else(|| corrupt(&format!("unknown event type code {}", self.event_type[i])))?;
        let tags = match &self.tags_json[i] {
            Some(raw) => Some(serde_json::from_str(raw)?),
            None => None,
        };

        Ok(StageRecord {
            tenant_id: self.tenant_id[i].clone(),
            building_name: self.building_name[i].clone(),
            space_id: self.space_id[i].clone(),
            device_id: self.device_id[i].clone(),
            point_id: self.point_id[i].clone(),
            sequence: self.sequence[i],
            occurred_at,
            ingested_at,
            event_type,
            severity: self.severity[i],
            value_json: self.value_json[i].clone(),
            payload_json: self.payload_json[i].clone(),
            tags,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = SEGMENT_MAGIC.to_vec();
        let body = bincode::serialize(&SegmentFile {
            version: SEGMENT_VERSION,
            columns: self.clone(),
        })?;
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(path: &Path, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SEGMENT_MAGIC.len() || bytes[..SEGMENT_MAGIC.len()] != SEGMENT_MAGIC {
            return Err(StorageError::corrupt_segment(path, "bad magic"));
        }
        let file: SegmentFile = bincode::deserialize(&bytes[SEGMENT_MAGIC.len()..])
            .map_err(|e| StorageError::corrupt_segment(path, e.to_string()))?;
        if file.version != SEGMENT_VERSION {
            return Err(StorageError::corrupt_segment(
                path,
                format!("unsupported version {}", file.version),
            ));
        }
        Ok(file.columns)
    }
}

/// Write a segment file, creating parent directories as needed.
pub async fn write_segment(path: &Path, columns: &SegmentColumns) -> Result<()> {
    let bytes = columns.encode()?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Read and decode a segment file.
pub async fn read_segment(path: &Path) -> Result<SegmentColumns> {
    let bytes = tokio::fs::read(path).await?;
    SegmentColumns::decode(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use contracts::{EventEnvelope, PointMessage, PointValue};

    fn record(point: &str, minute: u32, value: f64) -> StageRecord {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        let mut envelope = EventEnvelope::telemetry(
            PointMessage {
                tenant_id: "t1".to_string(),
                building_name: "hq".to_string(),
                space_id: "s1".to_string(),
                device_id: "d1".to_string(),
                point_id: point.to_string(),
                sequence: minute as i64,
                occurred_at: at,
                value: PointValue::Number(value),
            },
            at,
        );
        envelope.tags = Some(BTreeMap::from([("site".to_string(), "hq".to_string())]));
        envelope.to_stage_record().unwrap()
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry_20240501_1200.seg");

        let records = vec![record("p1", 1, 20.0), record("p2", 5, 21.5)];
        let columns = SegmentColumns::from_records(&records).unwrap();
        assert_eq!(columns.len(), 2);

        write_segment(&path, &columns).await.unwrap();
        let back = read_segment(&path).await.unwrap();
        assert_eq!(back, columns);

        for (i, original) in records.iter().enumerate() {
            assert_eq!(&back.record(i).unwrap(), original);
        }
    }

    #[tokio::test]
    async fn test_magic_prefix_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry_20240501_1200.seg");
        let columns = SegmentColumns::from_records(&[record("p1", 1, 20.0)]).unwrap();
        write_segment(&path, &columns).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"PLS1");
    }

    #[tokio::test]
    async fn test_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry_20240501_1200.seg");
        std::fs::write(&path, b"NOPE....").unwrap();
        assert!(matches!(
            read_segment(&path).await,
            Err(StorageError::CorruptSegment { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejects_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry_20240501_1200.seg");
        let columns = SegmentColumns::from_records(&[record("p1", 1, 20.0)]).unwrap();
        write_segment(&path, &columns).await.unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() / 2);
        std::fs::write(&path, &bytes).unwrap();
        assert!(read_segment(&path).await.is_err());
    }

    #[test]
    fn test_timestamps_stored_as_micros() {
        let r = record("p1", 1, 20.0);
        let columns = SegmentColumns::from_records(std::slice::from_ref(&r)).unwrap();
        assert_eq!(columns.occurred_at_micros[0], r.occurred_at.timestamp_micros());
        assert_eq!(columns.event_type[0], 0);
    }
}
