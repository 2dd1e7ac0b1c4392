//! EventEnvelope and StageRecord - Coordinator output / staging projection

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PointMessage, PointValue};

/// Kind of ingested event.
///
/// The segment column stores the integer encoding; staging lines use the
/// lowercase string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Telemetry,
    Log,
    Control,
}

impl EventType {
    /// Fixed integer encoding used by the segment column schema.
    pub fn as_i32(self) -> i32 {
        match self {
            EventType::Telemetry => 0,
            EventType::Log => 1,
            EventType::Control => 2,
        }
    }

    /// Inverse of [`EventType::as_i32`]; unknown codes map to None.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(EventType::Telemetry),
            1 => Some(EventType::Log),
            2 => Some(EventType::Control),
            _ => None,
        }
    }
}

/// A PointMessage wrapped with ingestion metadata.
///
/// Created once per message at the moment the batch is handed to sinks;
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// The wrapped message
    #[serde(flatten)]
    pub message: PointMessage,

    /// Server receipt time
    pub ingested_at: DateTime<Utc>,

    /// Event classification
    pub event_type: EventType,

    /// Severity, present only for Log events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,

    /// Raw structured document, used by non-telemetry event types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    /// Optional key/value tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl EventEnvelope {
    /// Wrap a telemetry message at receipt time.
    pub fn telemetry(message: PointMessage, ingested_at: DateTime<Utc>) -> Self {
        Self {
            message,
            ingested_at,
            event_type: EventType::Telemetry,
            severity: None,
            payload: None,
            tags: None,
        }
    }

    /// Project into the staging-log representation, serializing the value
    /// and payload to text.
    pub fn to_stage_record(&self) -> Result<StageRecord, serde_json::Error> {
        let payload_json = match &self.payload {
            Some(doc) => Some(serde_json::to_string(doc)?),
            None => None,
        };
        Ok(StageRecord {
            tenant_id: self.message.tenant_id.clone(),
            building_name: self.message.building_name.clone(),
            space_id: self.message.space_id.clone(),
            device_id: self.message.device_id.clone(),
            point_id: self.message.point_id.clone(),
            sequence: self.message.sequence,
            occurred_at: self.message.occurred_at,
            ingested_at: self.ingested_at,
            event_type: self.event_type,
            severity: self.severity,
            value_json: Some(self.message.value.to_json_string()?),
            payload_json,
            tags: self.tags.clone(),
        })
    }
}

/// On-disk projection of an EventEnvelope: one record = one line in a
/// staging log. Append-only; never rewritten in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub tenant_id: String,
    pub building_name: String,
    pub space_id: String,
    pub device_id: String,
    pub point_id: String,
    pub sequence: i64,
    pub occurred_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl StageRecord {
    /// Serialize to one staging-log line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse one staging-log line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Deserialize the point value back from its JSON text, if any.
    pub fn value(&self) -> Option<PointValue> {
        self.value_json
            .as_deref()
            .and_then(|v| serde_json::from_str(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message() -> PointMessage {
        PointMessage {
            tenant_id: "t1".to_string(),
            building_name: "hq".to_string(),
            space_id: "s1".to_string(),
            device_id: "d1".to_string(),
            point_id: "p1".to_string(),
            sequence: 7,
            occurred_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap(),
            value: PointValue::Number(20.0),
        }
    }

    #[test]
    fn test_event_type_int_encoding() {
        assert_eq!(EventType::Telemetry.as_i32(), 0);
        assert_eq!(EventType::Log.as_i32(), 1);
        assert_eq!(EventType::Control.as_i32(), 2);
        assert_eq!(EventType::from_i32(1), Some(EventType::Log));
        assert_eq!(EventType::from_i32(9), None);
    }

    #[test]
    fn test_stage_record_line_roundtrip() {
        let envelope = EventEnvelope::telemetry(message(), Utc::now());
        let record = envelope.to_stage_record().unwrap();
        let line = record.to_line().unwrap();
        assert!(!line.contains('\n'));
        let back = StageRecord::from_line(&line).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.value(), Some(PointValue::Number(20.0)));
    }

    #[test]
    fn test_stage_record_field_names() {
        let envelope = EventEnvelope::telemetry(message(), Utc::now());
        let record = envelope.to_stage_record().unwrap();
        let json: serde_json::Value = serde_json::from_str(&record.to_line().unwrap()).unwrap();
        for field in [
            "tenantId",
            "buildingName",
            "spaceId",
            "deviceId",
            "pointId",
            "sequence",
            "occurredAt",
            "ingestedAt",
            "eventType",
            "valueJson",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        // Absent optionals are omitted, not null
        assert!(json.get("severity").is_none());
        assert!(json.get("payloadJson").is_none());
        assert_eq!(json["eventType"], "telemetry");
    }
}
