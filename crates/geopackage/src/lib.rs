//! GeoPackage reader.
//!
//! Lists the layers of a GeoPackage (`gpkg_contents` joined with
//! `gpkg_geometry_columns`), resolves spatial reference systems and reads
//! layer rows with their geometry decoded from the GeoPackage binary format.
//! Nothing here interprets attribute meaning; that is left to callers.

pub mod error;
pub mod geometry;
pub mod reader;

pub use error::{GeoPackageError, GeoPackageResult};
pub use geometry::{decode_gpkg_blob, decode_wkb, Coord, Geometry, GeometryBlob, GeometryType};
pub use reader::{Feature, FieldValue, GeoPackage, LayerInfo};
