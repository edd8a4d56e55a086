//! Common types shared across the tim workspace.
//!
//! Everything here is a plain value: the extent of a model domain, the
//! output grid derived from it, the coordinate reference system read from
//! the input dataset and the multi-layer head grid handed to the writer.

pub mod bbox;
pub mod crs;
pub mod grid;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use grid::{GridError, GridSpec, ResultGrid, DEFAULT_MAX_CELLS};
