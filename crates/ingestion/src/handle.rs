//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{EventEnvelope, EventSink};

use crate::metrics::SinkMetrics;

/// A flushed batch shared across sink queues without deep copies.
pub type EventBatch = Arc<Vec<EventEnvelope>>;

/// Handle to a running sink worker.
///
/// The worker queue is bounded and [`SinkHandle::send`] awaits free space,
/// so a slow sink propagates backpressure up through the coordinator to the
/// connectors instead of dropping data.
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send batches to the worker
    tx: mpsc::Sender<EventBatch>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: EventSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Send a batch to the sink, waiting for queue space.
    ///
    /// Returns false only when the worker has gone away.
    pub async fn send(&self, batch: EventBatch) -> bool {
        match self.tx.send(batch).await {
            Ok(()) => {
                self.metrics.set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(_) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the sink worker gracefully
    #[instrument(name = "sink_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes batches and writes to the sink.
///
/// A failing write is logged and the worker keeps going; one sink's error
/// never blocks the others or the pipeline.
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: EventSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<EventBatch>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(batch) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write_batch(&batch).await {
            Ok(()) => {
                metrics.record_batch_written(batch.len());
            }
            Err(e) => {
                metrics.record_failure();
                error!(
                    sink = %name,
                    records = batch.len(),
                    error = %e,
                    "Batch write failed"
                );
            }
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::{ContractError, PointMessage, PointValue};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    fn batch(n: usize) -> EventBatch {
        let envelopes = (0..n)
            .map(|i| {
                EventEnvelope::telemetry(
                    PointMessage {
                        tenant_id: "t1".to_string(),
                        building_name: "hq".to_string(),
                        space_id: "s1".to_string(),
                        device_id: "d1".to_string(),
                        point_id: "p1".to_string(),
                        sequence: i as i64,
                        occurred_at: Utc::now(),
                        value: PointValue::Number(i as f64),
                    },
                    Utc::now(),
                )
            })
            .collect();
        Arc::new(envelopes)
    }

    /// Mock sink for testing
    struct MockSink {
        name: String,
        records: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl EventSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write_batch(&mut self, batch: &[EventEnvelope]) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.records.fetch_add(batch.len() as u64, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let records = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "test".to_string(),
            records: Arc::clone(&records),
            should_fail: false,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, 4);
        for _ in 0..5 {
            assert!(handle.send(batch(3)).await);
        }
        handle.shutdown().await;
        assert_eq!(records.load(Ordering::Relaxed), 15);
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let sink = MockSink {
            name: "failing".to_string(),
            records: Arc::new(AtomicU64::new(0)),
            should_fail: true,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, 4);
        for _ in 0..3 {
            assert!(handle.send(batch(1)).await);
        }
        // Worker stays alive despite failures
        sleep(Duration::from_millis(50)).await;
        assert!(handle.metrics().failure_count() >= 1);
        assert!(handle.send(batch(1)).await);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_slow_sink_blocks_not_drops() {
        let records = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "slow".to_string(),
            records: Arc::clone(&records),
            should_fail: false,
            delay_ms: 20,
        };

        // Tiny queue; sends await space instead of dropping
        let handle = SinkHandle::spawn(sink, 1);
        for _ in 0..10 {
            assert!(handle.send(batch(1)).await);
        }
        handle.shutdown().await;
        assert_eq!(records.load(Ordering::Relaxed), 10);
    }
}
