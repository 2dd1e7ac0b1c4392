//! EventSink trait - pluggable batch consumer
//!
//! Defines the abstract interface for sinks fed by the Ingestion Coordinator.

use crate::{ContractError, EventEnvelope};

/// Batch consumer trait.
///
/// All sink implementations must implement this trait. The coordinator fans
/// every flushed batch out to all enabled sinks; a failing write is logged
/// and isolated, never retried within the batch.
#[trait_variant::make(EventSink: Send)]
pub trait LocalEventSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Consume one flushed batch
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write_batch(&mut self, batch: &[EventEnvelope]) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
