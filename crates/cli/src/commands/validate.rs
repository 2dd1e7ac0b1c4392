//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    connector_count: usize,
    sink_count: usize,
    bucket_minutes: u32,
    staging_root: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(store) => {
            let warnings = collect_warnings(&store);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", store.version),
                    connector_count: store.connectors.len(),
                    sink_count: store.sinks.len(),
                    bucket_minutes: store.storage.bucket_minutes,
                    staging_root: store.storage.staging_root.display().to_string(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(store: &contracts::StoreConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if store.connectors.is_empty() {
        warnings.push("No connectors declared - pipeline will exit immediately".to_string());
    }

    let active_sinks = store
        .sinks
        .iter()
        .filter(|s| store.sink_enabled(&s.name))
        .count();
    if active_sinks == 0 {
        warnings.push("No sinks enabled - ingested data will be dropped".to_string());
    }

    if !store
        .sinks
        .iter()
        .any(|s| s.kind == contracts::SinkKind::Columnar && store.sink_enabled(&s.name))
    {
        warnings.push(
            "No columnar sink enabled - nothing will be staged or queryable".to_string(),
        );
    }

    if store.storage.compaction_interval_secs < 1 {
        warnings.push("storage.compaction_interval_secs below 1s will be clamped".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Connectors: {}", summary.connector_count);
            println!("  Sinks: {}", summary.sink_count);
            println!("  Bucket granularity: {} min", summary.bucket_minutes);
            println!("  Staging root: {}", summary.staging_root);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
