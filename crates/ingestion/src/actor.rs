//! Actor client implementations

use contracts::{ContractError, PointActorClient, PointMessage};
use tracing::trace;

/// No-op actor client.
///
/// Used when the pipeline runs without a live-state runtime (standalone
/// store, tests, local tooling).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActorClient;

impl PointActorClient for NullActorClient {
    async fn route_batch(&self, batch: &[PointMessage]) -> Result<(), ContractError> {
        trace!(records = batch.len(), "actor routing skipped (null client)");
        Ok(())
    }
}
