//! LogEventSink - logs batch summaries via tracing

use contracts::{ContractError, EventEnvelope, EventSink};
use tracing::{info, instrument};

/// Sink that logs batch summaries for debugging
pub struct LogEventSink {
    name: String,
}

impl LogEventSink {
    /// Create a new LogEventSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch_summary(&self, batch: &[EventEnvelope]) {
        let first = batch.first();
        info!(
            sink = %self.name,
            records = batch.len(),
            first_tenant = first.map(|e| e.message.tenant_id.as_str()).unwrap_or(""),
            first_device = first.map(|e| e.message.device_id.as_str()).unwrap_or(""),
            "batch received"
        );
    }
}

impl EventSink for LogEventSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, batch),
        fields(sink = %self.name, records = batch.len())
    )]
    async fn write_batch(&mut self, batch: &[EventEnvelope]) -> Result<(), ContractError> {
        self.log_batch_summary(batch);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogEventSink closed");
        Ok(())
    }
}
