//! Request failures and their wire representation.

use axum::http::StatusCode;
use grid_writer::WriteError;
use solver::SolverError;
use thiserror::Error;
use tim_common::GridError;
use tim_model::ModelError;
use tim_protocol::{ComputeResponse, ErrorKind, WorkerState};

/// Anything that can go wrong while serving a compute request.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Another request holds the worker.
    #[error("server is busy ({0})")]
    Busy(WorkerState),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ComputeError {
    /// Wire error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Model(e) => match e {
                ModelError::UnknownKind { .. } => ErrorKind::UnknownKind,
                ModelError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
                ModelError::InconsistentStack { .. } => ErrorKind::InconsistentStack,
                ModelError::EmptyDomain(_) => ErrorKind::EmptyDomain,
                ModelError::ConflictingElement(_) => ErrorKind::ConflictingElement,
                ModelError::UnsupportedKind { .. } => ErrorKind::UnsupportedKind,
                ModelError::LayerOutOfRange { .. }
                | ModelError::InvalidCellsize(_)
                | ModelError::Dataset(_) => ErrorKind::InvalidInput,
                ModelError::Serialization(_) => ErrorKind::Internal,
            },
            Self::Grid(_) => ErrorKind::InvalidInput,
            Self::Solver(e) => match e {
                SolverError::Unsupported(_) => ErrorKind::UnsupportedKind,
                SolverError::InvalidInput(_) => ErrorKind::InvalidInput,
                SolverError::Singular(_) => ErrorKind::Solver,
            },
            Self::Write(_) => ErrorKind::Write,
            Self::Busy(_) => ErrorKind::ServerBusy,
            Self::InvalidRequest(_) => ErrorKind::InvalidInput,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status carrying the failure response.
    pub fn status_code(&self) -> StatusCode {
        let kind = self.kind();
        if kind == ErrorKind::ServerBusy {
            StatusCode::CONFLICT
        } else if kind.is_input_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    pub fn to_response(&self) -> ComputeResponse {
        ComputeResponse::failure(self.kind(), self.to_string())
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tim_model::ElementKind;

    #[test]
    fn test_schema_mismatch_is_unprocessable() {
        let err = ComputeError::from(ModelError::SchemaMismatch {
            kind: ElementKind::Well,
            layer: "timmlWell:p".to_string(),
            row: Some(1),
            attribute: Some("discharge".to_string()),
            reason: "missing".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = err.to_response();
        assert!(response.message.contains("well"));
        assert!(response.message.contains("discharge"));
    }

    #[test]
    fn test_busy_is_conflict() {
        let err = ComputeError::Busy(WorkerState::Solving);
        assert_eq!(err.kind(), ErrorKind::ServerBusy);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("solving"));
    }

    #[test]
    fn test_server_side_faults() {
        assert_eq!(
            ComputeError::from(SolverError::Singular("2 x 2".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ComputeError::from(WriteError::Zarr("disk".into())).kind(),
            ErrorKind::Write
        );
        assert_eq!(
            ComputeError::from(SolverError::Unsupported("3 aquifers".into())).kind(),
            ErrorKind::UnsupportedKind
        );
    }
}
