//! Canned layers and models used across the test suite.
//!
//! Layer names follow the `timml<Kind>:<name>` convention the extractor
//! recognises.

use crate::cells;
use crate::gpkg::{GeoPackageBuilder, LayerFixture};
use crate::wkb;

/// The reference single-aquifer stack: k = 5, top = 0, bottom = -10, n = 0.3.
pub mod aquifer {
    pub const CONDUCTIVITY: f64 = 5.0;
    pub const TOP: f64 = 0.0;
    pub const BOTTOM: f64 = -10.0;
    pub const POROSITY: f64 = 0.3;
}

/// Aquifer table with the full column set and no rows.
pub fn aquifer_table(name: &str) -> LayerFixture {
    LayerFixture::attributes(&format!("timmlAquifer:{}", name))
        .column("conductivity", "REAL")
        .column("resistance", "REAL")
        .column("top", "REAL")
        .column("bottom", "REAL")
        .column("porosity", "REAL")
        .column("headtop", "REAL")
}

/// A confined single-aquifer stack.
pub fn single_aquifer() -> LayerFixture {
    aquifer_table("aquifer").row(cells![
        aquifer::CONDUCTIVITY,
        None::<f64>,
        aquifer::TOP,
        aquifer::BOTTOM,
        aquifer::POROSITY,
        None::<f64>
    ])
}

/// Rectangular model domain.
pub fn domain(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> LayerFixture {
    LayerFixture::features("timmlDomain:domain", "POLYGON")
        .feature(wkb::polygon(&wkb::rectangle(xmin, xmax, ymin, ymax)), vec![])
}

/// Empty constant-head table with its columns declared.
pub fn constant_table(name: &str) -> LayerFixture {
    LayerFixture::features(&format!("timmlConstant:{}", name), "POINT")
        .column("head", "REAL")
        .column("layer", "INTEGER")
        .column("label", "TEXT")
}

/// A single reference head point.
pub fn constant(x: f64, y: f64, head: f64) -> LayerFixture {
    constant_table("constant").feature(wkb::point(x, y), cells![head, 0i64, "reference"])
}

/// Empty well table with its columns declared.
pub fn well_table(name: &str) -> LayerFixture {
    LayerFixture::features(&format!("timmlWell:{}", name), "POINT")
        .column("discharge", "REAL")
        .column("radius", "REAL")
        .column("resistance", "REAL")
        .column("layer", "INTEGER")
        .column("label", "TEXT")
}

/// Empty head line sink table with its columns declared.
pub fn head_line_sink_table(name: &str) -> LayerFixture {
    LayerFixture::features(&format!("timmlHeadLineSink:{}", name), "LINESTRING")
        .column("head", "REAL")
        .column("resistance", "REAL")
        .column("width", "REAL")
        .column("order", "INTEGER")
        .column("layer", "INTEGER")
        .column("label", "TEXT")
}

/// Empty observation table with its label column declared.
pub fn observation_table(name: &str) -> LayerFixture {
    LayerFixture::features(&format!("timmlObservation:{}", name), "POINT").column("label", "TEXT")
}

/// One aquifer, domain (0, 1000, 0, 1000) and a constant head of 10 in the
/// centre. Without other elements the head is 10 everywhere.
pub fn constant_head_model() -> GeoPackageBuilder {
    GeoPackageBuilder::new()
        .layer(single_aquifer())
        .layer(domain(0.0, 1000.0, 0.0, 1000.0))
        .layer(constant(500.0, 500.0, 10.0))
}

/// The constant-head model plus one pumping well at the centre.
pub fn well_model(discharge: f64) -> GeoPackageBuilder {
    constant_head_model().layer(
        well_table("pumping").feature(
            wkb::point(250.0, 250.0),
            cells![discharge, 0.1, 0.0, 0i64, "p1"],
        ),
    )
}
