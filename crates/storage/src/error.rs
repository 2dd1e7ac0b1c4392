//! Storage error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by staging, segment and compaction code paths.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("staging write failed for '{path}': {message}")]
    StagingWrite { path: PathBuf, message: String },

    #[error("corrupt segment '{path}': {message}")]
    CorruptSegment { path: PathBuf, message: String },

    #[error("compaction failed for '{path}': {message}")]
    Compaction { path: PathBuf, message: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("segment codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn staging_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StagingWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn corrupt_segment(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptSegment {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn compaction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Compaction {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
