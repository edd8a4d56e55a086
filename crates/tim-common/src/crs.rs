//! Coordinate reference system metadata.
//!
//! The model works in whatever projected CRS the input dataset is stored in;
//! nothing is reprojected. The CRS is only carried through so the output
//! grid can be georeferenced by the consumer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CRS definition as stored in a GeoPackage `gpkg_spatial_ref_sys` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    /// Dataset-local SRS identifier.
    pub srs_id: i32,
    /// Human readable name, e.g. "Amersfoort / RD New".
    pub name: String,
    /// Defining organization, e.g. "EPSG".
    pub organization: String,
    /// Identifier within the organization, e.g. 28992.
    pub organization_coordsys_id: i32,
    /// Well-known text definition.
    pub wkt: String,
}

impl Crs {
    /// The GeoPackage "undefined Cartesian SRS" (srs_id -1).
    pub fn undefined() -> Self {
        Self {
            srs_id: -1,
            name: "Undefined Cartesian SRS".to_string(),
            organization: "NONE".to_string(),
            organization_coordsys_id: -1,
            wkt: "undefined".to_string(),
        }
    }

    /// Whether this is one of the GeoPackage placeholder definitions.
    pub fn is_undefined(&self) -> bool {
        self.srs_id <= 0 && self.organization.eq_ignore_ascii_case("NONE")
    }

    /// Authority string such as "EPSG:28992", if the CRS has one.
    pub fn authority(&self) -> Option<String> {
        if self.is_undefined() {
            None
        } else {
            Some(format!(
                "{}:{}",
                self.organization.to_uppercase(),
                self.organization_coordsys_id
            ))
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::undefined()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority() {
            Some(authority) => write!(f, "{}", authority),
            None => write!(f, "{}", self.name),
        }
    }
}
