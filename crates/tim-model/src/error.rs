//! Error types for the model crate.

use geopackage::GeoPackageError;
use thiserror::Error;

use crate::schema::ElementKind;

/// Errors raised while extracting, validating or translating a model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown element kind '{kind}' in layer '{layer}'")]
    UnknownKind { layer: String, kind: String },

    #[error("{}", schema_mismatch_message(.kind, .layer, .row, .attribute, .reason))]
    SchemaMismatch {
        kind: ElementKind,
        layer: String,
        /// Feature id of the offending row, if the fault is row specific.
        row: Option<i64>,
        attribute: Option<String>,
        reason: String,
    },

    #[error("Inconsistent aquifer stack{}: {reason}", .row.map(|r| format!(" at row {}", r)).unwrap_or_default())]
    InconsistentStack { row: Option<usize>, reason: String },

    #[error("Model domain is empty: {0}")]
    EmptyDomain(String),

    #[error("Conflicting elements: {0}")]
    ConflictingElement(String),

    #[error("Element kind {kind} (layer '{layer}') is not supported")]
    UnsupportedKind { kind: ElementKind, layer: String },

    #[error("{kind} layer '{layer}' row {row}: layer {value} is outside 0..{naq}")]
    LayerOutOfRange {
        kind: ElementKind,
        layer: String,
        row: i64,
        value: i64,
        naq: usize,
    },

    #[error("Invalid cellsize: {0}")]
    InvalidCellsize(f64),

    #[error("Dataset error: {0}")]
    Dataset(#[from] GeoPackageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn schema_mismatch_message(
    kind: &ElementKind,
    layer: &str,
    row: &Option<i64>,
    attribute: &Option<String>,
    reason: &str,
) -> String {
    let mut msg = format!("Schema mismatch in {} layer '{}'", kind, layer);
    if let Some(row) = row {
        msg.push_str(&format!(", row {}", row));
    }
    if let Some(attribute) = attribute {
        msg.push_str(&format!(", attribute '{}'", attribute));
    }
    msg.push_str(": ");
    msg.push_str(reason);
    msg
}

impl ModelError {
    pub(crate) fn mismatch(
        kind: ElementKind,
        layer: &str,
        row: Option<i64>,
        attribute: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            kind,
            layer: layer.to_string(),
            row,
            attribute: attribute.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub(crate) fn stack(row: Option<usize>, reason: impl Into<String>) -> Self {
        Self::InconsistentStack {
            row,
            reason: reason.into(),
        }
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
