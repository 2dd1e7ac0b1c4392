//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pointlake - bucketed telemetry ingestion and query pipeline
#[derive(Parser, Debug)]
#[command(
    name = "pointlake",
    author,
    version,
    about = "Bucketed telemetry ingestion, compaction and query pipeline",
    long_about = "Ingests telemetry point messages from configured connectors, batches \n\
                  them through a bounded queue, stages them as bucket-partitioned JSONL \n\
                  logs, compacts buckets into columnar segments with index sidecars, \n\
                  and answers pruned range queries over the result."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "POINTLAKE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "POINTLAKE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline with background compaction
    Run(RunArgs),

    /// Query compacted telemetry for one device
    Query(QueryArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "POINTLAKE_CONFIG")]
    pub config: PathBuf,

    /// Pipeline timeout in seconds (0 = run until shutdown signal)
    #[arg(long, default_value = "0", env = "POINTLAKE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "POINTLAKE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `query` command
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "POINTLAKE_CONFIG")]
    pub config: PathBuf,

    /// Tenant to query
    #[arg(long)]
    pub tenant: String,

    /// Device to query
    #[arg(long)]
    pub device: String,

    /// Window start, inclusive (RFC 3339, e.g. 2024-05-01T12:00:00Z)
    #[arg(long)]
    pub from: String,

    /// Window end, exclusive (RFC 3339)
    #[arg(long)]
    pub to: String,

    /// Restrict to one point id
    #[arg(long)]
    pub point: Option<String>,

    /// Maximum rows to return (defaults to the configured limit)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output rows as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show declared connectors
    #[arg(long)]
    pub connectors: bool,

    /// Show declared sinks
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
