//! Solver error types.

use thiserror::Error;

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The backend cannot represent part of the model.
    #[error("Unsupported by solver: {0}")]
    Unsupported(String),

    /// The system of equations has no unique solution.
    #[error("Singular system: {0}")]
    Singular(String),

    /// An element parameter is outside its valid range.
    #[error("Invalid solver input: {0}")]
    InvalidInput(String),
}
