//! Simulated telemetry generator
//!
//! Emits deterministic numeric readings for a configured tenant/device/point
//! grid. Used for local runs and tests when no real source is available.

use std::collections::HashMap;
use std::time::Duration;

use async_channel::Sender;
use chrono::Utc;
use contracts::{ContractError, PointMessage, PointValue};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::connector::{send_or_cancelled, Connector};
use crate::error::Result;

use super::{param_duration_ms, param_list};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Tenant the simulated building belongs to
    pub tenant_id: String,

    /// Building name
    pub building_name: String,

    /// Space the devices are installed in
    pub space_id: String,

    /// Simulated device ids
    pub devices: Vec<String>,

    /// Points emitted per device
    pub points: Vec<String>,

    /// Delay between emission rounds (one message per device x point each round)
    pub interval: Duration,

    /// Stop after this many messages (None = run until cancelled)
    pub max_messages: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tenant_id: "tenant-demo".to_string(),
            building_name: "demo-building".to_string(),
            space_id: "space-1".to_string(),
            devices: vec!["device-1".to_string()],
            points: vec!["temperature".to_string()],
            interval: Duration::from_millis(500),
            max_messages: None,
        }
    }
}

/// Simulated telemetry connector
pub struct SimulatorConnector {
    name: String,
    config: SimulatorConfig,
}

impl SimulatorConnector {
    /// Create with explicit configuration
    pub fn new(name: impl Into<String>, config: SimulatorConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Default demo simulator
    pub fn demo(name: impl Into<String>) -> Self {
        Self::new(name, SimulatorConfig::default())
    }

    /// Create from a config params map.
    ///
    /// Recognized params: `tenant`, `building`, `space`, `devices` (CSV),
    /// `points` (CSV), `interval_ms`, `max_messages`.
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::result::Result<Self, ContractError> {
        let defaults = SimulatorConfig::default();
        let max_messages = match params.get("max_messages") {
            None => None,
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                ContractError::config_validation("max_messages", format!("invalid count '{raw}'"))
            })?),
        };

        Ok(Self::new(
            name,
            SimulatorConfig {
                tenant_id: params
                    .get("tenant")
                    .cloned()
                    .unwrap_or(defaults.tenant_id),
                building_name: params
                    .get("building")
                    .cloned()
                    .unwrap_or(defaults.building_name),
                space_id: params.get("space").cloned().unwrap_or(defaults.space_id),
                devices: param_list(params, "devices", &["device-1"]),
                points: param_list(params, "points", &["temperature"]),
                interval: param_duration_ms(params, "interval_ms", defaults.interval)?,
                max_messages,
            },
        ))
    }

    /// Deterministic waveform so repeated runs are comparable.
    fn value_for(sequence: i64) -> PointValue {
        PointValue::Number(20.0 + (sequence as f64 * 0.25).sin() * 2.5)
    }
}

impl Connector for SimulatorConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self, output: Sender<PointMessage>, cancel: CancellationToken) -> Result<()> {
        let config = self.config;
        debug!(
            connector = %self.name,
            devices = config.devices.len(),
            points = config.points.len(),
            interval_ms = config.interval.as_millis() as u64,
            "simulator started"
        );

        // Sequence is monotonically increasing per device+point
        let mut sequences: HashMap<(usize, usize), i64> = HashMap::new();
        let mut emitted: u64 = 0;

        'outer: loop {
            for (di, device_id) in config.devices.iter().enumerate() {
                for (pi, point_id) in config.points.iter().enumerate() {
                    if let Some(max) = config.max_messages {
                        if emitted >= max {
                            break 'outer;
                        }
                    }

                    let sequence = sequences.entry((di, pi)).or_insert(0);
                    let message = PointMessage {
                        tenant_id: config.tenant_id.clone(),
                        building_name: config.building_name.clone(),
                        space_id: config.space_id.clone(),
                        device_id: device_id.clone(),
                        point_id: point_id.clone(),
                        sequence: *sequence,
                        occurred_at: Utc::now(),
                        value: Self::value_for(*sequence),
                    };
                    *sequence += 1;

                    if !send_or_cancelled(&output, &cancel, message).await {
                        break 'outer;
                    }
                    emitted += 1;
                    trace!(connector = %self.name, device = %device_id, point = %point_id, "simulated message sent");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(config.interval) => {}
            }
        }

        debug!(connector = %self.name, emitted, "simulator stopped");
        Ok(())
    }
}
