//! Result store round-trips, determinism and overwrite handling.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use grid_writer::{read, write, OverwritePolicy, ResultWriter, WriteError, WriterConfig, ZarrCompression};
use tim_common::{Crs, ResultGrid};

fn rd_new() -> Crs {
    Crs {
        srs_id: 28992,
        name: "Amersfoort / RD New".to_string(),
        organization: "EPSG".to_string(),
        organization_coordsys_id: 28992,
        wkt: "PROJCS[\"Amersfoort / RD New\"]".to_string(),
    }
}

fn grid(nlayer: usize, ny: usize, nx: usize) -> ResultGrid {
    let cellsize = 25.0;
    ResultGrid {
        layers: (0..nlayer as i64).collect(),
        x: (0..nx).map(|i| (i as f64 + 0.5) * cellsize).collect(),
        y: (0..ny).rev().map(|j| (j as f64 + 0.5) * cellsize).collect(),
        values: (0..nlayer * ny * nx).map(|i| 10.0 - i as f64 * 0.01).collect(),
        crs: rd_new(),
        cellsize,
    }
}

/// Every file under `root`, keyed by relative path.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(relative, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_round_trip_multi_layer() {
    let dir = tempfile::tempdir().unwrap();
    let original = grid(3, 4, 5);

    let path = write(&original, dir.path().join("model-25_0.zarr"), OverwritePolicy::Fail).unwrap();
    let back = read(&path).unwrap();

    assert_eq!(back.layers, vec![0, 1, 2]);
    assert_eq!(back.x, original.x);
    assert_eq!(back.y, original.y);
    assert_eq!(back.values, original.values);
    assert_eq!(back.crs, rd_new());
    assert_eq!(back.cellsize, 25.0);
}

#[test]
fn test_round_trip_keeps_nan() {
    let dir = tempfile::tempdir().unwrap();
    let mut original = grid(1, 2, 2);
    original.values[1] = f64::NAN;

    let path = write(&original, dir.path().join("nan.zarr"), OverwritePolicy::Fail).unwrap();
    let back = read(&path).unwrap();

    assert!(back.values[1].is_nan());
    assert_eq!(back.values[0], original.values[0]);
    assert_eq!(back.values[3], original.values[3]);
}

#[test]
fn test_round_trip_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ResultWriter::new(WriterConfig {
        compression: ZarrCompression::Gzip,
        compression_level: 6,
    });
    let original = grid(2, 30, 40);

    let path = writer
        .write(&original, dir.path().join("gz.zarr"), OverwritePolicy::Fail)
        .unwrap();
    let metadata = fs::read_to_string(path.join("head").join("zarr.json")).unwrap();
    assert!(metadata.contains("gzip"));

    assert_eq!(read(&path).unwrap(), original);
}

#[test]
fn test_head_declares_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&grid(1, 2, 3), dir.path().join("dims.zarr"), OverwritePolicy::Fail).unwrap();

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path.join("head").join("zarr.json")).unwrap())
            .unwrap();
    assert_eq!(
        metadata["attributes"]["_ARRAY_DIMENSIONS"],
        serde_json::json!(["layer", "y", "x"])
    );
    assert_eq!(metadata["shape"], serde_json::json!([1, 2, 3]));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_identical_grids_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(&grid(2, 5, 6), dir.path().join("a.zarr"), OverwritePolicy::Fail).unwrap();
    let second = write(&grid(2, 5, 6), dir.path().join("b.zarr"), OverwritePolicy::Fail).unwrap();

    let a = snapshot(&first);
    let b = snapshot(&second);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

// ============================================================================
// Overwrite policy
// ============================================================================

#[test]
fn test_fail_policy_refuses_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.zarr");
    write(&grid(1, 2, 2), &path, OverwritePolicy::Fail).unwrap();

    let err = write(&grid(1, 2, 2), &path, OverwritePolicy::Fail).unwrap_err();
    assert!(matches!(err, WriteError::AlreadyExists(p) if p == path));
}

#[test]
fn test_replace_policy_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.zarr");
    write(&grid(3, 4, 4), &path, OverwritePolicy::Fail).unwrap();

    let smaller = grid(1, 2, 2);
    write(&smaller, &path, OverwritePolicy::Replace).unwrap();

    assert_eq!(read(&path).unwrap(), smaller);
}

#[test]
fn test_replace_policy_on_plain_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.zarr");
    fs::write(&path, b"not a store").unwrap();

    write(&grid(1, 2, 2), &path, OverwritePolicy::Replace).unwrap();
    assert!(path.is_dir());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_read_missing_store() {
    let dir = tempfile::tempdir().unwrap();
    let err = read(dir.path().join("missing.zarr")).unwrap_err();
    assert!(matches!(err, WriteError::Zarr(_)));
}

#[test]
fn test_invalid_compression_level() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ResultWriter::new(WriterConfig {
        compression: ZarrCompression::Gzip,
        compression_level: 0,
    });
    let err = writer
        .write(&grid(1, 2, 2), dir.path().join("x.zarr"), OverwritePolicy::Fail)
        .unwrap_err();
    assert!(matches!(err, WriteError::Zarr(_)));
}
