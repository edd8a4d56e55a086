//! Builder that writes real GeoPackage files for tests.
//!
//! Only the parts of the format the reader looks at are written:
//! `gpkg_spatial_ref_sys`, `gpkg_contents`, `gpkg_geometry_columns` and one
//! table per layer with an integer `fid` primary key.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::wkb;

/// Amersfoort / RD New, the default test SRS.
pub const RD_NEW_SRS_ID: i32 = 28992;

/// A cell value in a fixture row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Build a `Vec<Cell>` from heterogeneous literals.
#[macro_export]
macro_rules! cells {
    ($($v:expr),* $(,)?) => {
        vec![$($crate::gpkg::Cell::from($v)),*]
    };
}

#[derive(Debug, Clone)]
struct FixtureRow {
    geometry: Option<Vec<u8>>,
    values: Vec<Cell>,
}

/// One layer table: declared columns plus rows.
#[derive(Debug, Clone)]
pub struct LayerFixture {
    name: String,
    geometry_type: Option<String>,
    columns: Vec<(String, String)>,
    rows: Vec<FixtureRow>,
}

impl LayerFixture {
    /// Attribute-only table (`data_type = 'attributes'`).
    pub fn attributes(name: &str) -> Self {
        Self {
            name: name.to_string(),
            geometry_type: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Feature table with a `geom` column of the given type name.
    pub fn features(name: &str, geometry_type: &str) -> Self {
        Self {
            geometry_type: Some(geometry_type.to_string()),
            ..Self::attributes(name)
        }
    }

    /// Declare a column with an SQLite type (`REAL`, `INTEGER`, `TEXT`, `BOOLEAN`).
    pub fn column(mut self, name: &str, sql_type: &str) -> Self {
        self.columns.push((name.to_string(), sql_type.to_string()));
        self
    }

    /// Append a row without geometry; values follow declared column order.
    pub fn row(mut self, values: Vec<Cell>) -> Self {
        self.rows.push(FixtureRow {
            geometry: None,
            values,
        });
        self
    }

    /// Append a row with a WKB geometry (wrapped into a GeoPackage blob on write).
    pub fn feature(mut self, wkb: Vec<u8>, values: Vec<Cell>) -> Self {
        self.rows.push(FixtureRow {
            geometry: Some(wkb),
            values,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Writes a GeoPackage with the configured layers.
#[derive(Debug, Clone)]
pub struct GeoPackageBuilder {
    srs_id: i32,
    layers: Vec<LayerFixture>,
}

impl Default for GeoPackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoPackageBuilder {
    pub fn new() -> Self {
        Self {
            srs_id: RD_NEW_SRS_ID,
            layers: Vec::new(),
        }
    }

    pub fn srs_id(mut self, srs_id: i32) -> Self {
        self.srs_id = srs_id;
        self
    }

    pub fn layer(mut self, layer: LayerFixture) -> Self {
        self.layers.push(layer);
        self
    }

    /// Write to `path`, which must not exist yet.
    pub async fn write(&self, path: &Path) -> Result<PathBuf, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        self.write_system_tables(&pool).await?;
        for layer in &self.layers {
            self.write_layer(&pool, layer).await?;
        }
        pool.close().await;
        Ok(path.to_path_buf())
    }

    /// Write into a fresh temporary directory. Keep the `TempDir` alive.
    pub async fn write_temp(&self, file_name: &str) -> Result<(TempDir, PathBuf), sqlx::Error> {
        let dir = TempDir::new()?;
        let path = self.write(&dir.path().join(file_name)).await?;
        Ok((dir, path))
    }

    async fn write_system_tables(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("PRAGMA application_id = 1196444487")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE gpkg_spatial_ref_sys (
                srs_name TEXT NOT NULL,
                srs_id INTEGER PRIMARY KEY,
                organization TEXT NOT NULL,
                organization_coordsys_id INTEGER NOT NULL,
                definition TEXT NOT NULL,
                description TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE gpkg_contents (
                table_name TEXT NOT NULL PRIMARY KEY,
                data_type TEXT NOT NULL,
                identifier TEXT UNIQUE,
                description TEXT DEFAULT '',
                last_change TEXT NOT NULL DEFAULT '2024-01-01T00:00:00.000Z',
                min_x DOUBLE, min_y DOUBLE, max_x DOUBLE, max_y DOUBLE,
                srs_id INTEGER
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE gpkg_geometry_columns (
                table_name TEXT NOT NULL,
                column_name TEXT NOT NULL,
                geometry_type_name TEXT NOT NULL,
                srs_id INTEGER NOT NULL,
                z TINYINT NOT NULL,
                m TINYINT NOT NULL,
                PRIMARY KEY (table_name, column_name)
            )
            "#,
        )
        .execute(pool)
        .await?;

        let srs = [
            (-1, "Undefined cartesian SRS", "NONE", -1, "undefined"),
            (0, "Undefined geographic SRS", "NONE", 0, "undefined"),
            (
                RD_NEW_SRS_ID,
                "Amersfoort / RD New",
                "EPSG",
                RD_NEW_SRS_ID,
                r#"PROJCS["Amersfoort / RD New",AUTHORITY["EPSG","28992"]]"#,
            ),
        ];
        for (id, name, org, org_id, wkt) in srs {
            sqlx::query(
                "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
                 (srs_name, srs_id, organization, organization_coordsys_id, definition) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(name)
            .bind(id)
            .bind(org)
            .bind(org_id)
            .bind(wkt)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    async fn write_layer(&self, pool: &SqlitePool, layer: &LayerFixture) -> Result<(), sqlx::Error> {
        let table = quote(&layer.name);
        let mut ddl = vec!["fid INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        if layer.geometry_type.is_some() {
            ddl.push("geom BLOB".to_string());
        }
        for (name, ty) in &layer.columns {
            ddl.push(format!("{} {}", quote(name), ty));
        }
        sqlx::query(&format!("CREATE TABLE {} ({})", table, ddl.join(", ")))
            .execute(pool)
            .await?;

        let data_type = if layer.geometry_type.is_some() {
            "features"
        } else {
            "attributes"
        };
        sqlx::query(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&layer.name)
        .bind(data_type)
        .bind(&layer.name)
        .bind(self.srs_id)
        .execute(pool)
        .await?;

        if let Some(geometry_type) = &layer.geometry_type {
            sqlx::query(
                "INSERT INTO gpkg_geometry_columns \
                 (table_name, column_name, geometry_type_name, srs_id, z, m) \
                 VALUES (?, 'geom', ?, ?, 0, 0)",
            )
            .bind(&layer.name)
            .bind(geometry_type)
            .bind(self.srs_id)
            .execute(pool)
            .await?;
        }

        let mut names: Vec<String> = Vec::new();
        if layer.geometry_type.is_some() {
            names.push("geom".to_string());
        }
        names.extend(layer.columns.iter().map(|(name, _)| quote(name)));

        for row in &layer.rows {
            if names.is_empty() {
                sqlx::query(&format!("INSERT INTO {} DEFAULT VALUES", table))
                    .execute(pool)
                    .await?;
                continue;
            }
            let placeholders = vec!["?"; names.len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                names.join(", "),
                placeholders
            );
            let mut query = sqlx::query(&sql);
            if layer.geometry_type.is_some() {
                query = query.bind(row.geometry.as_ref().map(|g| wkb::gpkg_blob(self.srs_id, g)));
            }
            for index in 0..layer.columns.len() {
                query = match row.values.get(index).unwrap_or(&Cell::Null) {
                    Cell::Null => query.bind(None::<i64>),
                    Cell::Int(v) => query.bind(*v),
                    Cell::Real(v) => query.bind(*v),
                    Cell::Text(v) => query.bind(v.clone()),
                };
            }
            query.execute(pool).await?;
        }
        Ok(())
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
