//! Ingestion error types

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Connector source failure after exhausting its retry budget
    #[error("connector '{connector}' gave up: {message}")]
    SourceExhausted {
        /// Connector name
        connector: String,
        /// Error message
        message: String,
    },

    /// Contract-level error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
