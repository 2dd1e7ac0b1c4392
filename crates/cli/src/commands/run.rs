//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let store = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        connectors = store.connectors.len(),
        sinks = store.sinks.len(),
        staging_root = %store.storage.staging_root.display(),
        bucket_minutes = store.storage.bucket_minutes,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&store);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        store,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let pipeline = Pipeline::new(pipeline_config);

    // Graceful shutdown: the signal handler cancels the token and the
    // pipeline drains its queue before returning
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        signal_cancel.cancel();
    });

    info!("Starting pipeline...");

    let stats = pipeline
        .run(cancel)
        .await
        .context("Pipeline execution failed")?;

    info!(
        records = stats.records_ingested,
        batches = stats.batches_flushed,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed successfully"
    );
    stats.print_summary();

    info!("Pointlake finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(store: &contracts::StoreConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Storage:");
    println!("  Staging root: {}", store.storage.staging_root.display());
    println!("  Segment root: {}", store.storage.segment_root.display());
    println!("  Index root: {}", store.storage.index_root.display());
    println!("  Bucket granularity: {} min", store.storage.bucket_minutes);
    println!(
        "  Compaction interval: {}s",
        store.storage.compaction_interval_secs
    );

    println!("\nIngestion:");
    println!("  Queue capacity: {}", store.ingestion.queue_capacity);
    println!("  Batch size: {}", store.ingestion.batch_size);

    println!("\nConnectors ({}):", store.connectors.len());
    for connector in &store.connectors {
        let state = if store.connector_enabled(&connector.name) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  - {} ({:?}) [{}]", connector.name, connector.kind, state);
    }

    println!("\nSinks ({}):", store.sinks.len());
    for sink in &store.sinks {
        let state = if store.sink_enabled(&sink.name) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  - {} ({:?}) [{}]", sink.name, sink.kind, state);
    }

    println!();
}
