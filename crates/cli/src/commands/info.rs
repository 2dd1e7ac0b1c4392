//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    ingestion: IngestionInfo,
    storage: StorageInfo,
    query: QueryInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    connectors: Vec<ConnectorInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct IngestionInfo {
    queue_capacity: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct StorageInfo {
    staging_root: String,
    segment_root: String,
    index_root: String,
    bucket_minutes: u32,
    compaction_interval_secs: u64,
}

#[derive(Serialize)]
struct QueryInfo {
    default_limit: usize,
}

#[derive(Serialize)]
struct ConnectorInfo {
    name: String,
    kind: String,
    enabled: bool,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    kind: String,
    enabled: bool,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let store = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&store, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&store, args);
    }

    Ok(())
}

fn build_config_info(store: &contracts::StoreConfig, args: &InfoArgs) -> ConfigInfo {
    let connectors = if args.connectors {
        store
            .connectors
            .iter()
            .map(|c| ConnectorInfo {
                name: c.name.clone(),
                kind: format!("{:?}", c.kind),
                enabled: store.connector_enabled(&c.name),
                params: c.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        store
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                kind: format!("{:?}", s.kind),
                enabled: store.sink_enabled(&s.name),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", store.version),
        ingestion: IngestionInfo {
            queue_capacity: store.ingestion.queue_capacity,
            batch_size: store.ingestion.batch_size,
        },
        storage: StorageInfo {
            staging_root: store.storage.staging_root.display().to_string(),
            segment_root: store.storage.segment_root.display().to_string(),
            index_root: store.storage.index_root.display().to_string(),
            bucket_minutes: store.storage.bucket_minutes,
            compaction_interval_secs: store.storage.compaction_interval_secs,
        },
        query: QueryInfo {
            default_limit: store.query.default_limit,
        },
        connectors,
        sinks,
    }
}

fn print_config_info(store: &contracts::StoreConfig, args: &InfoArgs) {
    println!("=== Pointlake Configuration ===\n");

    println!("Version: {:?}", store.version);

    println!("\nIngestion");
    println!("  Queue capacity: {}", store.ingestion.queue_capacity);
    println!("  Batch size: {}", store.ingestion.batch_size);

    println!("\nStorage");
    println!("  Staging root: {}", store.storage.staging_root.display());
    println!("  Segment root: {}", store.storage.segment_root.display());
    println!("  Index root: {}", store.storage.index_root.display());
    println!("  Bucket granularity: {} min", store.storage.bucket_minutes);
    println!(
        "  Compaction interval: {}s",
        store.storage.compaction_interval_secs
    );

    println!("\nQuery");
    println!("  Default limit: {}", store.query.default_limit);

    println!("\nConnectors ({})", store.connectors.len());
    for connector in &store.connectors {
        let state = if store.connector_enabled(&connector.name) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  - {} ({:?}) [{}]", connector.name, connector.kind, state);
        if args.connectors {
            for (key, value) in &connector.params {
                println!("      {key} = {value}");
            }
        }
    }

    println!("\nSinks ({})", store.sinks.len());
    for sink in &store.sinks {
        let state = if store.sink_enabled(&sink.name) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  - {} ({:?}) [{}]", sink.name, sink.kind, state);
        if args.sinks {
            println!("      queue_capacity = {}", sink.queue_capacity);
        }
    }

    println!();
}
