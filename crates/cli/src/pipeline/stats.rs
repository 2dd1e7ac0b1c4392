//! Pipeline statistics.

use std::time::Duration;

use observability::PipelineSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total messages pulled off the connector queue
    pub records_ingested: u64,

    /// Batches flushed by the coordinator
    pub batches_flushed: u64,

    /// Failed actor routing attempts (batches)
    pub actor_failures: u64,

    /// Connectors that ended with an error
    pub connector_failures: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of connectors that were spawned
    pub active_connectors: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Batch and compaction aggregates
    pub summary: PipelineSummary,
}

impl PipelineStats {
    /// Ingested records per second over the whole run
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_ingested as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Records ingested: {}", self.records_ingested);
        println!("Batches flushed: {}", self.batches_flushed);
        println!("Throughput: {:.2} records/s", self.records_per_sec());
        println!("Active connectors: {}", self.active_connectors);
        println!("Active sinks: {}", self.active_sinks);

        if self.actor_failures > 0 {
            println!("Actor routing failures: {}", self.actor_failures);
        }
        if self.connector_failures > 0 {
            println!("Connector failures: {}", self.connector_failures);
        }

        println!();
        print!("{}", self.summary);
        println!();
    }
}
