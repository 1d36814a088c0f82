//! Error types for the progress and workspace stores.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read or write a store file.
    #[error("Failed to access store file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A progress document could not be encoded or decoded.
    #[error("Invalid progress document at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The workspace registry could not be encoded or decoded.
    #[error("Invalid workspace registry at {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Workspace {0} not found")]
    WorkspaceNotFound(String),

    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    /// The store refused the write (used by in-memory stores in tests).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Type alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
