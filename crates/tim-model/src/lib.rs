//! Groundwater model definition: from GeoPackage layers to solver elements.
//!
//! The pipeline is
//!
//! 1. [`extract`]: read every `timml<Kind>:<name>` layer and validate it
//!    against the [`schema`] registry,
//! 2. [`build`]: assemble the aquifer stack, domain and element tables into
//!    an immutable [`ModelSpecification`] with content fingerprints,
//! 3. [`translate`]: turn the specification into solver [`Element`]s,
//! 4. optionally [`to_script`]: render the elements as a solver script.

pub mod aquifer;
pub mod element;
pub mod error;
pub mod extract;
pub mod schema;
pub mod script;
pub mod spec;
pub mod translate;
pub mod value;

pub use aquifer::{AquiferRow, AquiferStack, TopBoundary};
pub use element::Element;
pub use error::{ModelError, Result};
pub use extract::{extract, ExtractedRow, ExtractedTable, LayerName};
pub use schema::{schema_for, schema_for_name, ElementKind, GeometryKind, ScalarType, SchemaEntry};
pub use script::to_script;
pub use spec::{build, ModelSpecification};
pub use translate::{observations, translate};
pub use value::Value;
