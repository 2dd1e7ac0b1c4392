//! Built-in connectors
//!
//! One module per external source kind. All connectors are constructed from
//! a name plus a string parameter map (the `params` table of their config
//! entry) so the CLI can build them uniformly.

mod file_queue;
mod simulator;
mod tcp_stream;

pub use file_queue::{FileQueueConfig, FileQueueConnector};
pub use simulator::{SimulatorConfig, SimulatorConnector};
pub use tcp_stream::{TcpStreamConfig, TcpStreamConnector};

use std::collections::HashMap;
use std::time::Duration;

use contracts::ContractError;

/// Parse an optional millisecond-duration parameter.
pub(crate) fn param_duration_ms(
    params: &HashMap<String, String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ContractError> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ContractError::config_validation(key, format!("invalid duration '{raw}'"))),
    }
}

/// Parse a comma-separated list parameter, with a default when absent.
pub(crate) fn param_list(
    params: &HashMap<String, String>,
    key: &str,
    default: &[&str],
) -> Vec<String> {
    match params.get(key) {
        None => default.iter().map(|s| s.to_string()).collect(),
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}
