//! Zarr V3 output for solved head grids.
//!
//! A result store is a directory with a root group carrying the CRS, three
//! coordinate arrays (`layer`, `y`, `x`) and the `head` array with shape
//! `[layer, y, x]`. Every array carries `_ARRAY_DIMENSIONS` so xarray opens
//! the store as a dataset.
//!
//! # Example
//!
//! ```ignore
//! use grid_writer::{OverwritePolicy, ResultWriter, WriterConfig};
//!
//! let writer = ResultWriter::new(WriterConfig::default());
//! let path = writer.write(&grid, "model-100_0.zarr", OverwritePolicy::Replace)?;
//! let back = grid_writer::read(&path)?;
//! ```

pub mod config;
pub mod error;
pub mod zarr;

pub use config::{WriterConfig, ZarrCompression};
pub use error::{Result, WriteError};
pub use zarr::{read, write, OverwritePolicy, ResultWriter};
