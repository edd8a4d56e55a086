//! Error types for result writing.

use std::path::PathBuf;

use thiserror::Error;
use tim_common::GridError;

/// Errors that can occur while writing or reading a result store.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The destination exists and the overwrite policy forbids replacing it.
    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zarr format or storage error.
    #[error("Zarr error: {0}")]
    Zarr(String),

    /// The grid is internally inconsistent.
    #[error("invalid grid: {0}")]
    InvalidGrid(#[from] GridError),

    /// Store attributes could not be encoded or decoded.
    #[error("invalid store metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl WriteError {
    /// Create a Zarr error.
    pub fn zarr(msg: impl ToString) -> Self {
        Self::Zarr(msg.to_string())
    }
}

/// Result type for writer operations.
pub type Result<T> = std::result::Result<T, WriteError>;
