//! Pipeline orchestrator - wires connectors, coordinator, sinks and the
//! compaction sweeper from one StoreConfig.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ConnectorKind, ContractError, EventEnvelope, EventSink, SinkKind, StoreConfig};
use ingestion::connectors::{FileQueueConnector, SimulatorConnector, TcpStreamConnector};
use ingestion::sinks::LogEventSink;
use ingestion::{CoordinatorConfig, IngestionCoordinator, NullActorClient};
use observability::{record_batch_flushed, record_compaction_sweep, PipelineAggregator};
use storage::{ColumnarStorageSink, Compactor, StagingWriter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The loaded store configuration
    pub store: StoreConfig,

    /// Pipeline timeout (None = run until shutdown signal)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

/// Internal sink feeding the in-memory aggregator and recorder metrics.
///
/// Rides the normal fan-out so it observes exactly the batches the real
/// sinks receive.
struct StatsSink {
    aggregator: Arc<Mutex<PipelineAggregator>>,
}

impl EventSink for StatsSink {
    fn name(&self) -> &str {
        "pipeline-stats"
    }

    async fn write_batch(&mut self, batch: &[EventEnvelope]) -> Result<(), ContractError> {
        record_batch_flushed(batch.len());
        self.aggregator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .update_batch(batch.len());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the token is cancelled, all connectors end on
    /// their own, or the configured timeout fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let store = &self.config.store;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let aggregator = Arc::new(Mutex::new(PipelineAggregator::new()));
        let staging = Arc::new(StagingWriter::new(
            &store.storage.staging_root,
            store.storage.bucket_minutes,
        ));

        let mut coordinator = IngestionCoordinator::new(
            CoordinatorConfig {
                queue_capacity: store.ingestion.queue_capacity,
                batch_size: store.ingestion.batch_size,
            },
            NullActorClient,
            cancel.clone(),
        );

        // Declared sinks, filtered by the enable list
        let mut active_sinks = 0usize;
        for sink_config in &store.sinks {
            if !store.sink_enabled(&sink_config.name) {
                continue;
            }
            match sink_config.kind {
                SinkKind::Columnar => coordinator.attach_sink(
                    ColumnarStorageSink::new(&sink_config.name, Arc::clone(&staging)),
                    sink_config.queue_capacity,
                ),
                SinkKind::Log => coordinator.attach_sink(
                    LogEventSink::new(&sink_config.name),
                    sink_config.queue_capacity,
                ),
            }
            active_sinks += 1;
        }
        if active_sinks == 0 {
            warn!("No sinks enabled - ingested data will be dropped");
        }

        // Internal stats observer rides the same fan-out
        coordinator.attach_sink(
            StatsSink {
                aggregator: Arc::clone(&aggregator),
            },
            8,
        );

        // Declared connectors, filtered by the enable list
        let mut active_connectors = 0usize;
        for connector_config in &store.connectors {
            if !store.connector_enabled(&connector_config.name) {
                continue;
            }
            match connector_config.kind {
                ConnectorKind::Simulator => coordinator.spawn_connector(
                    SimulatorConnector::from_params(
                        &connector_config.name,
                        &connector_config.params,
                    )
                    .with_context(|| {
                        format!("Failed to build connector '{}'", connector_config.name)
                    })?,
                ),
                ConnectorKind::FileQueue => coordinator.spawn_connector(
                    FileQueueConnector::from_params(
                        &connector_config.name,
                        &connector_config.params,
                    )
                    .with_context(|| {
                        format!("Failed to build connector '{}'", connector_config.name)
                    })?,
                ),
                ConnectorKind::TcpStream => coordinator.spawn_connector(
                    TcpStreamConnector::from_params(
                        &connector_config.name,
                        &connector_config.params,
                    )
                    .with_context(|| {
                        format!("Failed to build connector '{}'", connector_config.name)
                    })?,
                ),
            }
            active_connectors += 1;
        }
        if active_connectors == 0 {
            warn!("No connectors enabled - pipeline will drain and exit immediately");
        }

        info!(
            connectors = active_connectors,
            sinks = active_sinks,
            bucket_minutes = store.storage.bucket_minutes,
            "Pipeline configured"
        );

        // Background compaction sweeper; keeps sweeping until cancelled,
        // then runs one final sweep so shutdown leaves nothing staged
        let compactor = Compactor::new(&store.storage);
        let compactor_cancel = cancel.child_token();
        let compactor_aggregator = Arc::clone(&aggregator);
        let compactor_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = compactor_cancel.cancelled() => break,
                    _ = tokio::time::sleep(compactor.interval()) => {}
                }
                let report = compactor.run_once().await;
                record_compaction_sweep(
                    report.files_compacted,
                    report.records_compacted,
                    report.failures,
                );
                compactor_aggregator
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .update_sweep(report.records_compacted);
            }
            let report = compactor.run_once().await;
            record_compaction_sweep(
                report.files_compacted,
                report.records_compacted,
                report.failures,
            );
            compactor_aggregator
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .update_sweep(report.records_compacted);
        });

        // Timeout watchdog
        if let Some(timeout) = self.config.timeout {
            let watchdog_cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = watchdog_cancel.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        warn!(timeout_secs = timeout.as_secs(), "Pipeline timeout reached");
                        watchdog_cancel.cancel();
                    }
                }
            });
        }

        let metrics = coordinator.metrics();

        info!("Pipeline running");
        coordinator.run().await;

        // Ingestion is drained; stop the sweeper (it runs a final sweep)
        cancel.cancel();
        compactor_task
            .await
            .context("Compaction sweeper task panicked")?;

        let snapshot = metrics.snapshot();
        let summary = aggregator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .summary();

        let stats = PipelineStats {
            records_ingested: snapshot.messages_received,
            batches_flushed: snapshot.batches_flushed,
            actor_failures: snapshot.actor_failures,
            connector_failures: snapshot.connector_failures,
            duration: start_time.elapsed(),
            active_connectors,
            active_sinks,
            summary,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            records = stats.records_ingested,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}
