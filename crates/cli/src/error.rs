//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Unparseable timestamp argument
    #[error("Invalid timestamp '{value}' for --{arg}: expected RFC 3339")]
    InvalidTimestamp { arg: String, value: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_timestamp(arg: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            arg: arg.into(),
            value: value.into(),
        }
    }
}
