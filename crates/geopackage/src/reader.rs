//! Read-only access to a GeoPackage file through sqlx.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tim_common::Crs;
use tracing::{debug, info};

use crate::error::{GeoPackageError, GeoPackageResult};
use crate::geometry::{decode_gpkg_blob, Geometry, GeometryType};

/// Column alias used to carry the SQLite rowid through `SELECT *`.
const FID_ALIAS: &str = "__fid";

/// A raw SQLite cell value, by storage class.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One entry of `gpkg_contents`, joined with its geometry column if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub table_name: String,
    /// `features` or `attributes`.
    pub data_type: String,
    pub srs_id: Option<i32>,
    pub geometry_column: Option<String>,
    pub geometry_type: Option<GeometryType>,
}

impl LayerInfo {
    pub fn has_geometry(&self) -> bool {
        self.geometry_column.is_some()
    }
}

/// One row of a layer table.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// SQLite rowid.
    pub fid: i64,
    /// Non-geometry columns, without the primary key.
    pub attributes: BTreeMap<String, FieldValue>,
    pub geometry: Option<Geometry>,
}

/// An open GeoPackage.
pub struct GeoPackage {
    pool: SqlitePool,
    path: PathBuf,
}

impl GeoPackage {
    /// Open an existing GeoPackage read-only.
    pub async fn open(path: &Path) -> GeoPackageResult<Self> {
        if !path.is_file() {
            return Err(GeoPackageError::NotFound(path.to_path_buf()));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let gpkg = Self {
            pool,
            path: path.to_path_buf(),
        };
        gpkg.require_table("gpkg_contents").await?;
        debug!(path = %path.display(), "Opened GeoPackage");
        Ok(gpkg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn table_exists(&self, name: &str) -> GeoPackageResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn require_table(&self, name: &str) -> GeoPackageResult<()> {
        if self.table_exists(name).await? {
            Ok(())
        } else {
            Err(GeoPackageError::MissingTable(name.to_string()))
        }
    }

    /// List all layers registered in `gpkg_contents`, ordered by table name.
    pub async fn layers(&self) -> GeoPackageResult<Vec<LayerInfo>> {
        let has_geometry_columns = self.table_exists("gpkg_geometry_columns").await?;
        let sql = if has_geometry_columns {
            r#"
            SELECT c.table_name, c.data_type, c.srs_id, g.column_name, g.geometry_type_name
            FROM gpkg_contents c
            LEFT JOIN gpkg_geometry_columns g ON g.table_name = c.table_name
            ORDER BY c.table_name
            "#
        } else {
            r#"
            SELECT table_name, data_type, srs_id, NULL AS column_name, NULL AS geometry_type_name
            FROM gpkg_contents
            ORDER BY table_name
            "#
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        let layers = rows
            .into_iter()
            .map(|row| {
                let geometry_type: Option<String> = row.get("geometry_type_name");
                LayerInfo {
                    table_name: row.get("table_name"),
                    data_type: row.get("data_type"),
                    srs_id: row.get::<Option<i64>, _>("srs_id").map(|v| v as i32),
                    geometry_column: row.get("column_name"),
                    geometry_type: geometry_type.as_deref().map(GeometryType::from_name),
                }
            })
            .collect::<Vec<_>>();

        info!(path = %self.path.display(), layers = layers.len(), "Listed GeoPackage layers");
        Ok(layers)
    }

    /// Look up a spatial reference system. Unknown ids give `Crs::undefined()`.
    pub async fn spatial_ref(&self, srs_id: i32) -> GeoPackageResult<Crs> {
        if !self.table_exists("gpkg_spatial_ref_sys").await? {
            return Ok(Crs::undefined());
        }

        let row = sqlx::query(
            r#"
            SELECT srs_name, srs_id, organization, organization_coordsys_id, definition
            FROM gpkg_spatial_ref_sys
            WHERE srs_id = ?
            "#,
        )
        .bind(srs_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => Crs {
                srs_id: row.get::<i64, _>("srs_id") as i32,
                name: row.get("srs_name"),
                organization: row.get("organization"),
                organization_coordsys_id: row.get::<i64, _>("organization_coordsys_id") as i32,
                wkt: row.get("definition"),
            },
            None => Crs::undefined(),
        })
    }

    /// Read every row of a layer, in rowid order.
    pub async fn read_layer(&self, layer: &LayerInfo) -> GeoPackageResult<Vec<Feature>> {
        let sql = format!(
            r#"SELECT rowid AS "{}", * FROM {} ORDER BY rowid"#,
            FID_ALIAS,
            quote_identifier(&layer.table_name)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let features = rows
            .iter()
            .map(|row| decode_feature(row, layer.geometry_column.as_deref()))
            .collect::<GeoPackageResult<Vec<_>>>()?;

        debug!(
            table = %layer.table_name,
            rows = features.len(),
            "Read GeoPackage layer"
        );
        Ok(features)
    }

    /// Close the underlying pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn decode_field(row: &SqliteRow, index: usize) -> GeoPackageResult<FieldValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }
    let value = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => FieldValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "NUMERIC" => FieldValue::Real(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => FieldValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => FieldValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

fn decode_feature(row: &SqliteRow, geometry_column: Option<&str>) -> GeoPackageResult<Feature> {
    let mut fid = 0;
    let mut attributes = BTreeMap::new();
    let mut geometry = None;

    for column in row.columns() {
        let name = column.name();
        let index = column.ordinal();

        if name == FID_ALIAS {
            fid = row.try_get::<i64, _>(index)?;
            continue;
        }
        if name.eq_ignore_ascii_case("fid") {
            continue;
        }

        let value = decode_field(row, index)?;
        if Some(name) == geometry_column {
            geometry = match value {
                FieldValue::Blob(bytes) => decode_gpkg_blob(&bytes)?.geometry,
                FieldValue::Null => None,
                other => {
                    return Err(GeoPackageError::InvalidGeometry(format!(
                        "column '{}' holds {:?}, expected a blob",
                        name, other
                    )))
                }
            };
            continue;
        }
        attributes.insert(name.to_string(), value);
    }

    Ok(Feature {
        fid,
        attributes,
        geometry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("timmlWell:a"), "\"timmlWell:a\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = GeoPackage::open(Path::new("/definitely/not/here.gpkg"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GeoPackageError::NotFound(_)));
    }
}
