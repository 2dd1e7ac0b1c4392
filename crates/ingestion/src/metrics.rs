//! Pipeline and per-sink metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Coordinator-level metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total messages drained from the shared queue
    pub messages_received: AtomicU64,

    /// Total batches flushed to sinks
    pub batches_flushed: AtomicU64,

    /// Total envelopes handed to sinks (across batches)
    pub records_flushed: AtomicU64,

    /// Actor routing failures (batch still delivered to sinks)
    pub actor_failures: AtomicU64,

    /// Connector tasks that ended with an error
    pub connector_failures: AtomicU64,

    /// Last observed shared-queue depth
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message drained from the queue
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flushed batch of the given size
    pub fn record_batch_flushed(&self, records: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.records_flushed
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    /// Record an actor routing failure
    pub fn record_actor_failure(&self) {
        self.actor_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connector ending in error
    pub fn record_connector_failure(&self) {
        self.connector_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update observed queue depth
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            actor_failures: self.actor_failures.load(Ordering::Relaxed),
            connector_failures: self.connector_failures.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Coordinator metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub batches_flushed: u64,
    pub records_flushed: u64,
    pub actor_failures: u64,
    pub connector_failures: u64,
    pub queue_len: usize,
}

/// Metrics for a single sink worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    batches_written: AtomicU64,
    records_written: AtomicU64,
    failure_count: AtomicU64,
    queue_len: AtomicUsize,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_written(&self) -> u64 {
        self.batches_written.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn record_batch_written(&self, records: usize) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.records_written
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }
}
