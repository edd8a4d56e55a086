//! Analytic-element solver interface.
//!
//! A [`Solver`] turns an aquifer stack plus translated elements into a
//! [`SolvedModel`] ("add elements" and "solve" in one step). A solved model
//! answers head queries and samples them onto a grid.
//!
//! [`ReferenceSolver`] is a small in-process backend for a single confined
//! aquifer. Everything it cannot represent is rejected with
//! [`SolverError::Unsupported`] rather than dropped.

pub mod error;
pub mod potential;
pub mod reference;

pub use error::{SolverError, SolverResult};
pub use reference::{ReferenceModel, ReferenceSolver};

use tim_common::{Crs, GridSpec, ResultGrid};
use tim_model::{AquiferStack, Element};

/// Builds and solves models.
pub trait Solver: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Add all elements to a model on `aquifer` and solve for unknown strengths.
    fn build(
        &self,
        aquifer: &AquiferStack,
        elements: &[Element],
    ) -> SolverResult<Box<dyn SolvedModel>>;
}

/// A solved model.
pub trait SolvedModel: Send + Sync {
    /// Number of aquifers, and so of values returned by [`head`](Self::head).
    fn naq(&self) -> usize;

    /// Head in every aquifer at `(x, y)`.
    fn head(&self, x: f64, y: f64) -> Vec<f64>;

    /// Sample heads at the cell centres of `grid`.
    fn head_grid(&self, grid: &GridSpec, crs: &Crs) -> ResultGrid {
        let naq = self.naq();
        let x = grid.x_coords();
        let y = grid.y_coords();
        let cells = x.len() * y.len();
        let mut values = vec![f64::NAN; naq * cells];

        for (row, &yc) in y.iter().enumerate() {
            for (col, &xc) in x.iter().enumerate() {
                let heads = self.head(xc, yc);
                for (layer, h) in heads.into_iter().take(naq).enumerate() {
                    values[layer * cells + row * x.len() + col] = h;
                }
            }
        }

        ResultGrid {
            layers: (0..naq as i64).collect(),
            x,
            y,
            values,
            crs: crs.clone(),
            cellsize: grid.cellsize,
        }
    }
}
