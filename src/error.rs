//! Error types for datalineage operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LineageError>;

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Repository not initialized under: {}", path.display())]
    NotInitialized { path: PathBuf },

    #[error("Version not found: {id}")]
    VersionNotFound { id: String },

    #[error("Version reference '{prefix}' is ambiguous ({matches} versions match)")]
    AmbiguousVersion { prefix: String, matches: usize },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Data processing error: {message}")]
    DataProcessing { message: String },

    #[error("Storage error at {}: {message}", path.display())]
    Storage { path: PathBuf, message: String },
}

impl LineageError {
    pub fn not_initialized(path: impl Into<PathBuf>) -> Self {
        Self::NotInitialized { path: path.into() }
    }

    pub fn version_not_found(id: impl Into<String>) -> Self {
        Self::VersionNotFound { id: id.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn data_processing(msg: impl Into<String>) -> Self {
        Self::DataProcessing {
            message: msg.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// True for failures of the underlying byte store
    pub fn is_io_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Storage { .. } | Self::WalkDir(_))
    }
}
