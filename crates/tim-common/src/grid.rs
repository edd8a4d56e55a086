//! Output grid specification and the multi-layer head grid.

use crate::{BoundingBox, Crs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a grid cannot be constructed or is internally inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("cellsize must be finite and positive, got {0}")]
    InvalidCellsize(f64),

    #[error("extent {0:?} has no area")]
    DegenerateExtent(BoundingBox),

    #[error("grid shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("grid of {nx} x {ny} cells exceeds the limit of {max} cells")]
    TooManyCells { nx: f64, ny: f64, max: usize },
}

/// Cells per layer allowed by [`GridSpec::from_extent`].
pub const DEFAULT_MAX_CELLS: usize = 25_000_000;

/// A regular, north-up raster derived from a domain extent and a cellsize.
///
/// The extent is grown outward until every side lies on a multiple of the
/// cellsize, so repeated runs with the same cellsize line up cell for cell.
/// Values are sampled at cell centres; rows run from north to south.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Rounded extent covered by the cells.
    pub extent: BoundingBox,
    /// Cell edge length in CRS units.
    pub cellsize: f64,
    /// Number of columns.
    pub nx: usize,
    /// Number of rows.
    pub ny: usize,
}

impl GridSpec {
    /// Build a grid covering `extent` with square cells of `cellsize`.
    pub fn from_extent(extent: &BoundingBox, cellsize: f64) -> Result<Self, GridError> {
        Self::from_extent_with_limit(extent, cellsize, DEFAULT_MAX_CELLS)
    }

    /// Like [`from_extent`](Self::from_extent), refusing grids with more
    /// than `max_cells` cells before anything is allocated.
    pub fn from_extent_with_limit(
        extent: &BoundingBox,
        cellsize: f64,
        max_cells: usize,
    ) -> Result<Self, GridError> {
        if !cellsize.is_finite() || cellsize <= 0.0 {
            return Err(GridError::InvalidCellsize(cellsize));
        }
        if extent.is_degenerate() {
            return Err(GridError::DegenerateExtent(*extent));
        }

        let rounded = BoundingBox::new(
            (extent.min_x / cellsize).floor() * cellsize,
            (extent.min_y / cellsize).floor() * cellsize,
            (extent.max_x / cellsize).ceil() * cellsize,
            (extent.max_y / cellsize).ceil() * cellsize,
        );
        let nx = (rounded.width() / cellsize).round();
        let ny = (rounded.height() / cellsize).round();
        if !(nx * ny <= max_cells as f64) {
            return Err(GridError::TooManyCells {
                nx,
                ny,
                max: max_cells,
            });
        }
        let (nx, ny) = (nx as usize, ny as usize);

        Ok(Self {
            extent: rounded,
            cellsize,
            nx,
            ny,
        })
    }

    /// Cell-centre x coordinates, west to east.
    pub fn x_coords(&self) -> Vec<f64> {
        (0..self.nx)
            .map(|i| self.extent.min_x + (i as f64 + 0.5) * self.cellsize)
            .collect()
    }

    /// Cell-centre y coordinates, north to south (decreasing).
    pub fn y_coords(&self) -> Vec<f64> {
        (0..self.ny)
            .map(|j| self.extent.max_y - (j as f64 + 0.5) * self.cellsize)
            .collect()
    }

    /// Total number of cells per layer.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }
}

/// Computed heads for every aquifer layer on a regular grid.
///
/// `values` is stored layer-major, then row-major: the value for
/// `(layer, row, col)` lives at `layer * ny * nx + row * nx + col`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGrid {
    /// Aquifer layer indices, in output order.
    pub layers: Vec<i64>,
    /// Cell-centre x coordinates (increasing).
    pub x: Vec<f64>,
    /// Cell-centre y coordinates (decreasing).
    pub y: Vec<f64>,
    /// Head values, shape `[layers, y, x]`.
    pub values: Vec<f64>,
    /// Coordinate reference system of `x` and `y`.
    pub crs: Crs,
    /// Cell size used to derive the coordinates.
    pub cellsize: f64,
}

impl ResultGrid {
    /// Shape as `(nlayer, ny, nx)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.layers.len(), self.y.len(), self.x.len())
    }

    /// Check that the value buffer matches the coordinate vectors.
    pub fn validate(&self) -> Result<(), GridError> {
        let (nlayer, ny, nx) = self.shape();
        if nlayer == 0 || ny == 0 || nx == 0 {
            return Err(GridError::ShapeMismatch(format!(
                "grid has an empty dimension: {} layers, {} rows, {} columns",
                nlayer, ny, nx
            )));
        }
        if self.values.len() != nlayer * ny * nx {
            return Err(GridError::ShapeMismatch(format!(
                "expected {} values for shape ({}, {}, {}), got {}",
                nlayer * ny * nx,
                nlayer,
                ny,
                nx,
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Values of a single layer (by position in `layers`), row-major.
    pub fn layer_values(&self, position: usize) -> Option<&[f64]> {
        let (nlayer, ny, nx) = self.shape();
        if position >= nlayer {
            return None;
        }
        let size = ny * nx;
        self.values.get(position * size..(position + 1) * size)
    }

    /// Value at `(layer position, row, col)`.
    pub fn get(&self, position: usize, row: usize, col: usize) -> Option<f64> {
        let (_, ny, nx) = self.shape();
        if row >= ny || col >= nx {
            return None;
        }
        self.layer_values(position)
            .and_then(|layer| layer.get(row * nx + col).copied())
    }
}
