//! Test support for the tim crates.
//!
//! - [`GeoPackageBuilder`] writes real GeoPackage files with sqlx, so the
//!   extractor is always exercised against SQLite rather than mocks.
//! - [`wkb`] encodes points, lines and polygons as GeoPackage geometry blobs.
//! - [`fixtures`] has the standard layers (aquifer, domain, constant, wells)
//!   and small complete models.
//! - [`assert_approx_eq!`] and [`assert_all_approx_eq!`] compare heads.
//!
//! Pull it in as a dev-dependency with a path, e.g.
//! `test-utils = { path = "../test-utils" }`, then:
//!
//! ```ignore
//! let (_dir, path) = fixtures::constant_head_model().write_temp("m.gpkg").await?;
//! ```

pub mod fixtures;
pub mod gpkg;
pub mod wkb;

pub use gpkg::{Cell, GeoPackageBuilder, LayerFixture, RD_NEW_SRS_ID};

/// Fail unless `|actual - expected| <= tolerance`. NaN never passes.
///
/// ```ignore
/// assert_approx_eq!(model.head(0.0, 0.0)[0], 10.0, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        let error = (actual - expected).abs();
        if !(error <= tolerance) {
            panic!(
                "assertion failed: {:?} is not within {:?} of {:?} (off by {:?})",
                actual, tolerance, expected, error
            );
        }
    }};
}

/// Apply [`assert_approx_eq!`] to every value of a slice, naming the index
/// of the first failure.
///
/// ```ignore
/// assert_all_approx_eq!(&grid.values, 10.0, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_all_approx_eq {
    ($values:expr, $expected:expr, $tolerance:expr) => {{
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        for (index, value) in $values.iter().enumerate() {
            let value = *value as f64;
            if !((value - expected).abs() <= tolerance) {
                panic!(
                    "assertion failed at index {}: {:?} is not within {:?} of {:?}",
                    index, value, tolerance, expected
                );
            }
        }
    }};
}
