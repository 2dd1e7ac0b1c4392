//! PointMessage - Connector output
//!
//! One observed value for one point at one instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observed point value.
///
/// Opaque to the pipeline: serialized to text only at the staging/segment
/// boundary. Untagged so that plain JSON scalars deserialize naturally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    /// Boolean reading (e.g. occupancy, fault flag)
    Bool(bool),

    /// Numeric reading (temperature, power, setpoint...)
    Number(f64),

    /// Free-text reading
    Text(String),

    /// Structured document (multi-field readings)
    Structured(serde_json::Value),
}

impl PointValue {
    /// Serialize to the JSON text used by staging logs and segments.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One normalized telemetry message for a single point.
///
/// Produced by connectors; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointMessage {
    /// Tenant owning the building
    pub tenant_id: String,

    /// Human-readable building name
    pub building_name: String,

    /// Space (floor/room) the device is installed in
    pub space_id: String,

    /// Device emitting the reading
    pub device_id: String,

    /// Point on the device (one sensor/actuator channel)
    pub point_id: String,

    /// Producer-assigned sequence, monotonically increasing per device+point
    pub sequence: i64,

    /// Event time (when the reading was observed at the source)
    pub occurred_at: DateTime<Utc>,

    /// The observed value
    pub value: PointValue,
}
