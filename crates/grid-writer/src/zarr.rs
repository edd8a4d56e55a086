//! Zarr V3 store layout for [`ResultGrid`].
//!
//! Layout below the store root:
//!
//! ```text
//! zarr.json         group, CRS attributes
//! layer/zarr.json   int64   [layer]
//! y/zarr.json       float64 [y]        (decreasing)
//! x/zarr.json       float64 [x]
//! head/zarr.json    float64 [layer, y, x], NaN fill, one chunk per layer
//! ```
//!
//! Nothing time dependent is written, so equal grids give equal bytes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tim_common::{Crs, GridError, ResultGrid};
use tracing::{debug, info, warn};
use zarrs::array::codec::bytes_to_bytes::gzip::GzipCodec;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::config::{WriterConfig, ZarrCompression};
use crate::error::{Result, WriteError};

/// Name of the CRS variable referenced by `grid_mapping`.
const GRID_MAPPING: &str = "spatial_ref";

const LAYER: &str = "/layer";
const X: &str = "/x";
const Y: &str = "/y";
const HEAD: &str = "/head";

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Refuse with [`WriteError::AlreadyExists`].
    #[default]
    Fail,
    /// Remove the existing store first.
    Replace,
}

/// Root group attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GroupAttributes {
    cellsize: f64,
    crs_name: String,
    crs_organization: String,
    crs_organization_coordsys_id: i32,
    crs_wkt: String,
    grid_mapping: String,
    srs_id: i32,
}

impl GroupAttributes {
    fn new(grid: &ResultGrid) -> Self {
        Self {
            cellsize: grid.cellsize,
            crs_name: grid.crs.name.clone(),
            crs_organization: grid.crs.organization.clone(),
            crs_organization_coordsys_id: grid.crs.organization_coordsys_id,
            crs_wkt: grid.crs.wkt.clone(),
            grid_mapping: GRID_MAPPING.to_string(),
            srs_id: grid.crs.srs_id,
        }
    }

    fn crs(&self) -> Crs {
        Crs {
            srs_id: self.srs_id,
            name: self.crs_name.clone(),
            organization: self.crs_organization.clone(),
            organization_coordsys_id: self.crs_organization_coordsys_id,
            wkt: self.crs_wkt.clone(),
        }
    }
}

fn to_attributes<T: Serialize>(value: &T) -> Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(WriteError::zarr(format!(
            "attributes must be an object, got {}",
            other
        ))),
    }
}

fn dimensions(names: &[&str]) -> serde_json::Map<String, serde_json::Value> {
    let mut attrs = serde_json::Map::new();
    attrs.insert(
        "_ARRAY_DIMENSIONS".to_string(),
        serde_json::json!(names),
    );
    attrs
}

/// Writer for result stores.
#[derive(Debug, Clone, Default)]
pub struct ResultWriter {
    config: WriterConfig,
}

impl ResultWriter {
    /// Create a new writer with the given configuration.
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Write `grid` as a Zarr V3 directory store at `destination`.
    ///
    /// On failure the partially written store is removed.
    pub fn write(
        &self,
        grid: &ResultGrid,
        destination: impl AsRef<Path>,
        policy: OverwritePolicy,
    ) -> Result<PathBuf> {
        let destination = destination.as_ref();
        grid.validate()?;
        self.config.validate().map_err(WriteError::Zarr)?;

        if destination.exists() {
            match policy {
                OverwritePolicy::Fail => {
                    return Err(WriteError::AlreadyExists(destination.to_path_buf()))
                }
                OverwritePolicy::Replace => {
                    debug!(path = %destination.display(), "Removing existing store");
                    if destination.is_dir() {
                        fs::remove_dir_all(destination)?;
                    } else {
                        fs::remove_file(destination)?;
                    }
                }
            }
        }

        fs::create_dir_all(destination)?;
        if let Err(e) = self.write_store(grid, destination) {
            if let Err(cleanup) = fs::remove_dir_all(destination) {
                warn!(
                    path = %destination.display(),
                    error = %cleanup,
                    "Failed to remove partial store"
                );
            }
            return Err(e);
        }

        let (nlayer, ny, nx) = grid.shape();
        info!(
            path = %destination.display(),
            layers = nlayer,
            ny = ny,
            nx = nx,
            compression = self.config.compression.as_str(),
            "Wrote result grid"
        );
        Ok(destination.to_path_buf())
    }

    fn write_store(&self, grid: &ResultGrid, destination: &Path) -> Result<()> {
        let store = Arc::new(FilesystemStore::new(destination).map_err(WriteError::zarr)?);

        let mut binding = GroupBuilder::new();
        let group = binding
            .attributes(to_attributes(&GroupAttributes::new(grid))?)
            .build(store.clone(), "/")
            .map_err(WriteError::zarr)?;
        group.store_metadata().map_err(WriteError::zarr)?;

        let (nlayer, ny, nx) = grid.shape();

        let layer = self.build_array(
            store.clone(),
            LAYER,
            vec![nlayer as u64],
            DataType::Int64,
            FillValue::from(-1i64),
            dimensions(&["layer"]),
            false,
        )?;
        store_elements(&layer, grid.layers.as_slice())?;

        let mut y_attrs = dimensions(&["y"]);
        y_attrs.insert("axis".to_string(), serde_json::json!("Y"));
        let y = self.build_array(
            store.clone(),
            Y,
            vec![ny as u64],
            DataType::Float64,
            FillValue::from(f64::NAN),
            y_attrs,
            false,
        )?;
        store_elements(&y, grid.y.as_slice())?;

        let mut x_attrs = dimensions(&["x"]);
        x_attrs.insert("axis".to_string(), serde_json::json!("X"));
        let x = self.build_array(
            store.clone(),
            X,
            vec![nx as u64],
            DataType::Float64,
            FillValue::from(f64::NAN),
            x_attrs,
            false,
        )?;
        store_elements(&x, grid.x.as_slice())?;

        let mut head_attrs = dimensions(&["layer", "y", "x"]);
        head_attrs.insert("grid_mapping".to_string(), serde_json::json!(GRID_MAPPING));
        head_attrs.insert("long_name".to_string(), serde_json::json!("hydraulic head"));
        let head = self.build_array(
            store,
            HEAD,
            vec![nlayer as u64, ny as u64, nx as u64],
            DataType::Float64,
            FillValue::from(f64::NAN),
            head_attrs,
            true,
        )?;
        store_elements(&head, grid.values.as_slice())?;

        Ok(())
    }

    /// Build an array and store its metadata. Coordinates are a single
    /// chunk; the head array is chunked per layer.
    #[allow(clippy::too_many_arguments)]
    fn build_array<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: Arc<S>,
        path: &str,
        shape: Vec<u64>,
        data_type: DataType,
        fill_value: FillValue,
        attrs: serde_json::Map<String, serde_json::Value>,
        compress: bool,
    ) -> Result<Array<S>> {
        let chunk_shape: Vec<u64> = match shape.as_slice() {
            [_, rest @ ..] if !rest.is_empty() => {
                std::iter::once(1).chain(rest.iter().copied()).collect()
            }
            _ => shape.clone(),
        };
        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .try_into()
            .map_err(|e| WriteError::zarr(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(shape, data_type, chunk_grid, fill_value);
        let mut builder = binding.attributes(attrs);

        if compress && self.config.compression != ZarrCompression::None {
            let codec = self.create_compression_codec()?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder.build(storage, path).map_err(WriteError::zarr)?;
        array.store_metadata().map_err(WriteError::zarr)?;
        Ok(array)
    }

    fn create_compression_codec(
        &self,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        match self.config.compression {
            ZarrCompression::Gzip => {
                let codec = GzipCodec::new(u32::from(self.config.compression_level))
                    .map_err(WriteError::zarr)?;
                Ok(Arc::new(codec))
            }
            ZarrCompression::None => Err(WriteError::Zarr(
                "No compression configured".to_string(),
            )),
        }
    }
}

fn store_elements<S, T>(array: &Array<S>, data: &[T]) -> Result<()>
where
    S: ReadableStorageTraits + WritableStorageTraits + 'static,
    T: zarrs::array::Element,
{
    let subset = ArraySubset::new_with_start_shape(vec![0; array.shape().len()], array.shape().to_vec())
        .map_err(WriteError::zarr)?;
    array
        .store_array_subset_elements(&subset, data)
        .map_err(WriteError::zarr)
}

fn retrieve_elements<S, T>(store: &Arc<S>, path: &str) -> Result<(Vec<u64>, Vec<T>)>
where
    S: ReadableStorageTraits + 'static,
    T: zarrs::array::ElementOwned,
{
    let array = Array::open(store.clone(), path).map_err(WriteError::zarr)?;
    let data = array
        .retrieve_array_subset_elements(&array.subset_all())
        .map_err(WriteError::zarr)?;
    Ok((array.shape().to_vec(), data))
}

/// Write `grid` with the default configuration.
pub fn write(
    grid: &ResultGrid,
    destination: impl AsRef<Path>,
    policy: OverwritePolicy,
) -> Result<PathBuf> {
    ResultWriter::default().write(grid, destination, policy)
}

/// Read a result store written by [`ResultWriter`].
pub fn read(path: impl AsRef<Path>) -> Result<ResultGrid> {
    let path = path.as_ref();
    let store = Arc::new(FilesystemStore::new(path).map_err(WriteError::zarr)?);

    let group = Group::open(store.clone(), "/").map_err(WriteError::zarr)?;
    let attrs: GroupAttributes =
        serde_json::from_value(serde_json::Value::Object(group.attributes().clone()))?;

    let (_, layers) = retrieve_elements::<_, i64>(&store, LAYER)?;
    let (_, y) = retrieve_elements::<_, f64>(&store, Y)?;
    let (_, x) = retrieve_elements::<_, f64>(&store, X)?;
    let (shape, values) = retrieve_elements::<_, f64>(&store, HEAD)?;

    let expected = [layers.len() as u64, y.len() as u64, x.len() as u64];
    if shape != expected {
        return Err(WriteError::InvalidGrid(GridError::ShapeMismatch(format!(
            "head shape {:?} does not match coordinates {:?}",
            shape, expected
        ))));
    }

    let grid = ResultGrid {
        layers,
        x,
        y,
        values,
        crs: attrs.crs(),
        cellsize: attrs.cellsize,
    };
    grid.validate()?;
    debug!(path = %path.display(), shape = ?grid.shape(), "Read result grid");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> ResultGrid {
        ResultGrid {
            layers: vec![0, 1],
            x: vec![5.0, 15.0, 25.0],
            y: vec![15.0, 5.0],
            values: (0..12).map(f64::from).collect(),
            crs: Crs::undefined(),
            cellsize: 10.0,
        }
    }

    #[test]
    fn test_group_attributes_round_trip() {
        let grid = sample_grid();
        let attrs = to_attributes(&GroupAttributes::new(&grid)).unwrap();
        assert_eq!(attrs["grid_mapping"], "spatial_ref");
        assert_eq!(attrs["srs_id"], -1);

        let back: GroupAttributes =
            serde_json::from_value(serde_json::Value::Object(attrs)).unwrap();
        assert_eq!(back.crs(), grid.crs);
    }

    #[test]
    fn test_attribute_keys_sorted() {
        let attrs = to_attributes(&GroupAttributes::new(&sample_grid())).unwrap();
        let keys: Vec<&String> = attrs.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zarr");
        let grid = sample_grid();

        write(&grid, &path, OverwritePolicy::Fail).unwrap();
        assert!(path.join("zarr.json").exists());
        assert!(path.join("head").join("zarr.json").exists());

        assert_eq!(read(&path).unwrap(), grid);
    }

    #[test]
    fn test_invalid_grid_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zarr");
        let mut grid = sample_grid();
        grid.values.pop();

        let err = write(&grid, &path, OverwritePolicy::Fail).unwrap_err();
        assert!(matches!(err, WriteError::InvalidGrid(_)));
        assert!(!path.exists());
    }
}
