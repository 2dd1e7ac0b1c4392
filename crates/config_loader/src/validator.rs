//! Configuration validation
//!
//! Rules:
//! - connector/sink names unique
//! - enable lists only reference declared names
//! - queue_capacity, batch_size, bucket_minutes, default_limit > 0
//! - batch_size <= queue_capacity
//! - storage roots distinct

use std::collections::HashSet;

use contracts::{ContractError, StoreConfig};

/// Validate a StoreConfig.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &StoreConfig) -> Result<(), ContractError> {
    validate_ingestion(config)?;
    validate_storage(config)?;
    validate_query(config)?;
    validate_names(config)?;
    validate_enable_lists(config)?;
    Ok(())
}

fn validate_ingestion(config: &StoreConfig) -> Result<(), ContractError> {
    if config.ingestion.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "ingestion.queue_capacity",
            "must be > 0",
        ));
    }
    if config.ingestion.batch_size == 0 {
        return Err(ContractError::config_validation(
            "ingestion.batch_size",
            "must be > 0",
        ));
    }
    if config.ingestion.batch_size > config.ingestion.queue_capacity {
        return Err(ContractError::config_validation(
            "ingestion.batch_size",
            format!(
                "must not exceed queue_capacity ({})",
                config.ingestion.queue_capacity
            ),
        ));
    }
    Ok(())
}

fn validate_storage(config: &StoreConfig) -> Result<(), ContractError> {
    let storage = &config.storage;
    if storage.bucket_minutes == 0 {
        return Err(ContractError::config_validation(
            "storage.bucket_minutes",
            "must be > 0",
        ));
    }
    if storage.compaction_interval_secs == 0 {
        return Err(ContractError::config_validation(
            "storage.compaction_interval_secs",
            "must be > 0",
        ));
    }

    // The three stores must not share a root: the compactor deletes staging
    // files and would otherwise race the segment/index trees.
    let roots = [
        ("storage.staging_root", &storage.staging_root),
        ("storage.segment_root", &storage.segment_root),
        ("storage.index_root", &storage.index_root),
    ];
    for (i, (field, root)) in roots.iter().enumerate() {
        if root.as_os_str().is_empty() {
            return Err(ContractError::config_validation(*field, "must not be empty"));
        }
        for (other_field, other) in roots.iter().skip(i + 1) {
            if root == other {
                return Err(ContractError::config_validation(
                    *field,
                    format!("must differ from {other_field}"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_query(config: &StoreConfig) -> Result<(), ContractError> {
    if config.query.default_limit == 0 {
        return Err(ContractError::config_validation(
            "query.default_limit",
            "must be > 0",
        ));
    }
    Ok(())
}

fn validate_names(config: &StoreConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for connector in &config.connectors {
        if !seen.insert(&connector.name) {
            return Err(ContractError::config_validation(
                format!("connectors[name={}]", connector.name),
                "duplicate connector name",
            ));
        }
    }

    let mut seen = HashSet::new();
    for sink in &config.sinks {
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "must be > 0",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

fn validate_enable_lists(config: &StoreConfig) -> Result<(), ContractError> {
    for name in &config.enabled_connectors {
        if !config.connectors.iter().any(|c| &c.name == name) {
            return Err(ContractError::config_validation(
                "enabled_connectors",
                format!("'{name}' is not a declared connector"),
            ));
        }
    }
    for name in &config.enabled_sinks {
        if !config.sinks.iter().any(|s| &s.name == name) {
            return Err(ContractError::config_validation(
                "enabled_sinks",
                format!("'{name}' is not a declared sink"),
            ));
        }
    }
    Ok(())
}
