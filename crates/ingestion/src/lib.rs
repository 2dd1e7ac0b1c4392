//! # Ingestion Pipeline
//!
//! Connectors and the Ingestion Coordinator.
//!
//! Responsibilities:
//! - Run one task per enabled connector, all feeding a single bounded
//!   multi-producer queue (producers block when full: explicit backpressure)
//! - Drain the queue into size-bounded batches; flush on a full batch and
//!   again when the queue runs dry, so latency tracks production rate
//! - Route each batch to the external per-point actor, then fan it out to
//!   all attached sinks with per-sink error isolation
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionCoordinator, CoordinatorConfig, NullActorClient};
//! use ingestion::connectors::SimulatorConnector;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let mut coordinator = IngestionCoordinator::new(
//!     CoordinatorConfig::default(),
//!     NullActorClient,
//!     cancel.clone(),
//! );
//! coordinator.attach_sink(my_sink, 8);
//! coordinator.spawn_connector(SimulatorConnector::demo("sim"));
//! coordinator.run().await;
//! ```

mod actor;
mod connector;
pub mod connectors;
mod coordinator;
mod error;
mod handle;
mod metrics;
pub mod sinks;

pub use actor::NullActorClient;
pub use connector::Connector;
pub use contracts::{EventEnvelope, PointMessage};
pub use coordinator::{CoordinatorConfig, IngestionCoordinator};
pub use error::{IngestionError, Result};
pub use handle::{EventBatch, SinkHandle};
pub use metrics::{IngestionMetrics, MetricsSnapshot, SinkMetrics};
