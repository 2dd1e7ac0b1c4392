//! PointActorClient trait - boundary to the external per-point actor runtime
//!
//! The grain runtime holding live per-device/per-point state is an external
//! collaborator. The coordinator routes every batch to it before fanning out
//! to sinks; ordering and staleness rejection happen on the actor side, not
//! in this store.

use crate::{ContractError, PointMessage};

/// Client for the external per-point actor runtime.
#[trait_variant::make(PointActorClient: Send)]
pub trait LocalPointActorClient {
    /// Deliver a batch of messages to the live-state actors.
    ///
    /// # Errors
    /// Returns a routing error; the caller logs it and still delivers the
    /// batch to sinks (the durable path does not depend on live state).
    async fn route_batch(&self, batch: &[PointMessage]) -> Result<(), ContractError>;
}
