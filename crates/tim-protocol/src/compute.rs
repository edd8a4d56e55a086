//! Compute request and response bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the server should do with the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Build, solve and write the head grid.
    #[default]
    Compute,
    /// Write an equivalent solver script next to the dataset, without solving.
    ScriptExport,
}

/// A request to process one GeoPackage dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    /// Path of the GeoPackage on the server's filesystem.
    pub path: String,
    /// Output cell size in CRS units.
    pub cellsize: f64,
    #[serde(default)]
    pub mode: Mode,
}

impl ComputeRequest {
    pub fn compute(path: impl Into<String>, cellsize: f64) -> Self {
        Self {
            path: path.into(),
            cellsize,
            mode: Mode::Compute,
        }
    }

    pub fn script_export(path: impl Into<String>, cellsize: f64) -> Self {
        Self {
            path: path.into(),
            cellsize,
            mode: Mode::ScriptExport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SchemaMismatch,
    UnknownKind,
    InconsistentStack,
    EmptyDomain,
    ConflictingElement,
    UnsupportedKind,
    InvalidInput,
    Solver,
    Write,
    ServerBusy,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaMismatch => "schema_mismatch",
            Self::UnknownKind => "unknown_kind",
            Self::InconsistentStack => "inconsistent_stack",
            Self::EmptyDomain => "empty_domain",
            Self::ConflictingElement => "conflicting_element",
            Self::UnsupportedKind => "unsupported_kind",
            Self::InvalidInput => "invalid_input",
            Self::Solver => "solver",
            Self::Write => "write",
            Self::ServerBusy => "server_busy",
            Self::Internal => "internal",
        }
    }

    /// Faults in the caller's input, as opposed to server-side trouble.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch
                | Self::UnknownKind
                | Self::InconsistentStack
                | Self::EmptyDomain
                | Self::ConflictingElement
                | Self::UnsupportedKind
                | Self::InvalidInput
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heads sampled at one observation point after the solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationHead {
    pub label: String,
    pub x: f64,
    pub y: f64,
    /// One value per aquifer, top down. `None` where the head is undefined,
    /// e.g. exactly on a well.
    pub heads: Vec<Option<f64>>,
}

/// Reply to a [`ComputeRequest`]. `path` is present exactly when the
/// request succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Observation heads of a successful compute request, in layer order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<ObservationHead>,
}

impl ComputeResponse {
    pub fn success(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            path: Some(path.into()),
            error: None,
            observations: Vec::new(),
        }
    }

    pub fn with_observations(mut self, observations: Vec<ObservationHead>) -> Self {
        self.observations = observations;
        self
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failure,
            message: message.into(),
            path: None,
            error: Some(kind),
            observations: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
