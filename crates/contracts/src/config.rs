//! StoreConfig - Config Loader output
//!
//! Describes the full pipeline: queue/batch sizing, storage roots and bucket
//! granularity, query defaults, connector and sink declarations with
//! enable lists.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Ingestion queue/batch settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Storage roots and compaction settings
    pub storage: StorageConfig,

    /// Query defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Declared connectors
    #[serde(default)]
    pub connectors: Vec<ConnectorConfig>,

    /// Declared sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Connector enable list; empty = all declared connectors are active
    #[serde(default)]
    pub enabled_connectors: Vec<String>,

    /// Sink enable list; empty = all declared sinks are active
    #[serde(default)]
    pub enabled_sinks: Vec<String>,
}

impl StoreConfig {
    /// Whether a declared connector is active under the enable list.
    pub fn connector_enabled(&self, name: &str) -> bool {
        self.enabled_connectors.is_empty() || self.enabled_connectors.iter().any(|n| n == name)
    }

    /// Whether a declared sink is active under the enable list.
    pub fn sink_enabled(&self, name: &str) -> bool {
        self.enabled_sinks.is_empty() || self.enabled_sinks.iter().any(|n| n == name)
    }
}

/// Ingestion queue and batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Bounded queue capacity between connectors and the coordinator
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum batch size flushed to the actor and sinks
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_batch_size() -> usize {
    256
}

/// Storage roots, bucket granularity and compaction cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of staging logs
    pub staging_root: PathBuf,

    /// Root directory of columnar segments
    pub segment_root: PathBuf,

    /// Root directory of index sidecars
    pub index_root: PathBuf,

    /// Bucket granularity in minutes
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: u32,

    /// Compaction interval in seconds (floor-enforced minimum of 1)
    #[serde(default = "default_compaction_interval_secs")]
    pub compaction_interval_secs: u64,
}

fn default_bucket_minutes() -> u32 {
    15
}

fn default_compaction_interval_secs() -> u64 {
    5
}

/// Query engine defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Result cap applied when a request carries no explicit limit
    #[serde(default = "default_query_limit")]
    pub default_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_query_limit(),
        }
    }
}

fn default_query_limit() -> usize {
    1000
}

/// Connector kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Simulated telemetry generator
    Simulator,
    /// Drop-box directory consumer (local message-queue stand-in)
    FileQueue,
    /// Line-delimited JSON feed over TCP
    TcpStream,
}

/// Declared connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Unique connector name
    pub name: String,

    /// Connector kind
    pub kind: ConnectorKind,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Columnar storage sink (staging + compaction + query store)
    Columnar,
    /// Batch-summary logging sink
    Log,
}

/// Declared sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Unique sink name
    pub name: String,

    /// Sink kind
    pub kind: SinkKind,

    /// Capacity of the sink's worker queue (in batches)
    #[serde(default = "default_sink_queue_capacity")]
    pub queue_capacity: usize,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_sink_queue_capacity() -> usize {
    8
}
