//! Columnar storage sink
//!
//! The durable sink of the pipeline: delegates every batch to the staging
//! writer. Compaction into segments happens out of band.

use std::sync::Arc;

use contracts::{ContractError, EventEnvelope, EventSink};
use tracing::{debug, instrument};

use crate::staging::StagingWriter;

pub struct ColumnarStorageSink {
    name: String,
    staging: Arc<StagingWriter>,
}

impl ColumnarStorageSink {
    pub fn new(name: impl Into<String>, staging: Arc<StagingWriter>) -> Self {
        Self {
            name: name.into(),
            staging,
        }
    }
}

impl EventSink for ColumnarStorageSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "columnar_sink_write",
        skip(self, batch),
        fields(sink = %self.name, records = batch.len())
    )]
    async fn write_batch(&mut self, batch: &[EventEnvelope]) -> Result<(), ContractError> {
        let written = self
            .staging
            .write_batch(batch)
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        ::metrics::counter!("pointlake_records_staged_total").increment(written as u64);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        // Staging appends are flushed per batch
        Ok(())
    }

    #[instrument(name = "columnar_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "columnar sink closed");
        Ok(())
    }
}
