//! `query` command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use observability::record_query_rows;
use query::{QueryEngine, QueryRequest};
use tracing::info;

use crate::cli::QueryArgs;
use crate::error::CliError;

/// Execute the `query` command
pub async fn run_query(args: &QueryArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }
    let store = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let request = QueryRequest {
        tenant_id: args.tenant.clone(),
        device_id: args.device.clone(),
        from: parse_timestamp("from", &args.from)?,
        to: parse_timestamp("to", &args.to)?,
        point_id: args.point.clone(),
        limit: args.limit,
    };

    info!(
        tenant = %request.tenant_id,
        device = %request.device_id,
        from = %request.from,
        to = %request.to,
        "Executing query"
    );

    let engine = QueryEngine::new(&store.storage, &store.query);
    let rows = engine
        .execute(&request)
        .await
        .context("Query execution failed")?;
    record_query_rows(rows.len());

    if args.json {
        for row in &rows {
            println!("{}", serde_json::to_string(row)?);
        }
    } else {
        print_rows(&rows);
    }

    Ok(())
}

fn parse_timestamp(arg: &str, raw: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| CliError::invalid_timestamp(arg, raw))
}

fn print_rows(rows: &[query::QueryRow]) {
    if rows.is_empty() {
        println!("No rows.");
        return;
    }
    println!(
        "{:<28} {:<20} {:>10}  {}",
        "OCCURRED AT", "POINT", "SEQ", "VALUE"
    );
    for row in rows {
        println!(
            "{:<28} {:<20} {:>10}  {}",
            row.occurred_at.to_rfc3339(),
            row.point_id,
            row.sequence,
            row.value_json.as_deref().unwrap_or("-")
        );
    }
    println!("\n{} row(s).", rows.len());
}
