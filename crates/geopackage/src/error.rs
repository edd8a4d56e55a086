//! Error types for GeoPackage access.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for GeoPackage operations.
pub type GeoPackageResult<T> = Result<T, GeoPackageError>;

/// Error types for GeoPackage access.
#[derive(Error, Debug)]
pub enum GeoPackageError {
    /// The dataset path does not exist
    #[error("GeoPackage not found: {0}")]
    NotFound(PathBuf),

    /// SQLite could not open or query the file
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A geometry blob could not be decoded
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A mandatory GeoPackage system table is absent
    #[error("Missing table: {0}")]
    MissingTable(String),
}
