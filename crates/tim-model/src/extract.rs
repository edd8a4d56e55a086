//! Reads a GeoPackage and validates each element layer against the schema registry.

use std::collections::BTreeMap;
use std::path::Path;

use geopackage::{Feature, GeoPackage, Geometry, GeometryType, LayerInfo};
use serde::Serialize;
use tim_common::Crs;
use tracing::{debug, info, instrument, warn};

use crate::error::{ModelError, Result};
use crate::schema::{schema_for, ElementKind, GeometryKind, SchemaEntry};
use crate::value::Value;

/// Prefix every element layer name starts with.
pub const LAYER_PREFIX: &str = "timml";

/// Suffix of tables holding per-element properties for another layer.
const ASSOCIATED_SUFFIX: &str = "properties";

/// One validated row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRow {
    /// Feature id (SQLite rowid).
    pub fid: i64,
    /// Declared attributes (converted, defaults applied) plus undeclared columns.
    pub values: BTreeMap<String, Value>,
    /// Single-part geometry; `None` for attribute tables.
    pub geometry: Option<Geometry>,
}

impl ExtractedRow {
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }
}

/// All rows of one element layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedTable {
    pub kind: ElementKind,
    /// Full layer name, e.g. `timmlWell:north`.
    pub layer: String,
    /// Name part after the colon, e.g. `north`.
    pub name: String,
    pub crs: Crs,
    pub rows: Vec<ExtractedRow>,
}

impl ExtractedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A layer name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerName {
    pub kind: String,
    pub name: String,
    /// An associated properties table (`timml<Kind>Properties:<name>`).
    pub associated: bool,
}

impl LayerName {
    /// Split `timml<Kind>:<name>`. Returns `None` for layers without the prefix.
    pub fn parse(layer: &str) -> Option<Self> {
        let prefix = layer.get(..LAYER_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(LAYER_PREFIX) {
            return None;
        }
        let rest = &layer[LAYER_PREFIX.len()..];
        let (kind, name) = match rest.split_once(':') {
            Some((kind, name)) => (kind.trim(), name.trim()),
            None => (rest.trim(), rest.trim()),
        };

        let lowered = kind.to_ascii_lowercase();
        let associated = lowered.ends_with(ASSOCIATED_SUFFIX);
        let kind = if associated {
            kind[..kind.len() - ASSOCIATED_SUFFIX.len()].trim()
        } else {
            kind
        };

        Some(Self {
            kind: kind.to_string(),
            name: name.to_string(),
            associated,
        })
    }
}

/// Extract every element layer of the GeoPackage at `path`, keyed by layer name.
///
/// All-or-nothing: the first invalid row fails the whole extraction.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn extract(path: &Path) -> Result<BTreeMap<String, ExtractedTable>> {
    let gpkg = GeoPackage::open(path).await?;
    let result = extract_from(&gpkg).await;
    gpkg.close().await;
    result
}

async fn extract_from(gpkg: &GeoPackage) -> Result<BTreeMap<String, ExtractedTable>> {
    let mut tables = BTreeMap::new();
    let mut crs_cache: BTreeMap<i32, Crs> = BTreeMap::new();

    for layer in gpkg.layers().await? {
        let Some(parsed) = LayerName::parse(&layer.table_name) else {
            debug!(layer = %layer.table_name, "Ignoring non-element layer");
            continue;
        };

        let kind = ElementKind::from_name(&parsed.kind).map_err(|_| ModelError::UnknownKind {
            layer: layer.table_name.clone(),
            kind: parsed.kind.clone(),
        })?;

        if parsed.associated {
            debug!(
                layer = %layer.table_name,
                kind = %kind,
                "Skipping associated properties table"
            );
            continue;
        }

        let crs = match layer.srs_id {
            Some(srs_id) => match crs_cache.get(&srs_id) {
                Some(crs) => crs.clone(),
                None => {
                    let crs = gpkg.spatial_ref(srs_id).await?;
                    crs_cache.insert(srs_id, crs.clone());
                    crs
                }
            },
            None => Crs::undefined(),
        };

        let features = gpkg.read_layer(&layer).await?;
        let table = validate_layer(kind, &layer, &parsed.name, crs, features)?;
        debug!(
            layer = %table.layer,
            kind = %kind,
            rows = table.rows.len(),
            "Extracted layer"
        );
        tables.insert(table.layer.clone(), table);
    }

    info!(tables = tables.len(), "Extraction complete");
    Ok(tables)
}

/// Validate raw features against the kind's schema.
pub fn validate_layer(
    kind: ElementKind,
    layer: &LayerInfo,
    name: &str,
    crs: Crs,
    features: Vec<Feature>,
) -> Result<ExtractedTable> {
    let schema = schema_for(kind);

    if schema.geometry != GeometryKind::None && !layer.has_geometry() {
        return Err(ModelError::mismatch(
            kind,
            &layer.table_name,
            None,
            Some("geometry"),
            "layer has no geometry column",
        ));
    }
    if let Some(declared) = layer.geometry_type {
        if schema.geometry != GeometryKind::None && !geometry_matches(schema.geometry, declared) {
            return Err(ModelError::mismatch(
                kind,
                &layer.table_name,
                None,
                Some("geometry"),
                format!(
                    "declared geometry type {:?}, expected {:?}",
                    declared, schema.geometry
                ),
            ));
        }
    }

    let rows = features
        .into_iter()
        .map(|feature| validate_row(schema, &layer.table_name, feature))
        .collect::<Result<Vec<_>>>()?;

    Ok(ExtractedTable {
        kind,
        layer: layer.table_name.clone(),
        name: name.to_string(),
        crs,
        rows,
    })
}

fn geometry_matches(expected: GeometryKind, actual: GeometryType) -> bool {
    matches!(
        (expected, actual.single_part()),
        (GeometryKind::Point, GeometryType::Point)
            | (GeometryKind::Line, GeometryType::LineString)
            | (GeometryKind::Polygon, GeometryType::Polygon)
    )
}

/// Infinite floats would hash as `null` and reach the solver as garbage.
fn check_finite(kind: ElementKind, layer: &str, fid: i64, column: &str, value: &Value) -> Result<()> {
    match value {
        Value::Float(v) if !v.is_finite() => Err(ModelError::mismatch(
            kind,
            layer,
            Some(fid),
            Some(column),
            format!("non-finite value {}", v),
        )),
        _ => Ok(()),
    }
}

fn validate_row(schema: &SchemaEntry, layer: &str, mut feature: Feature) -> Result<ExtractedRow> {
    let kind = schema.kind;
    let fid = feature.fid;
    let mut values = BTreeMap::new();

    for decl in schema.attributes {
        let raw = match feature.attributes.remove(decl.name) {
            Some(raw) => Some(raw),
            None => {
                let key = feature
                    .attributes
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(decl.name))
                    .cloned();
                key.and_then(|k| feature.attributes.remove(&k))
            }
        };

        let converted = match raw {
            Some(raw) => Value::convert(&raw, decl.ty)
                .map_err(|reason| ModelError::mismatch(kind, layer, Some(fid), Some(decl.name), reason))?,
            None => Value::Null,
        };

        let value = if converted.is_null() {
            decl.missing_value().ok_or_else(|| {
                ModelError::mismatch(
                    kind,
                    layer,
                    Some(fid),
                    Some(decl.name),
                    "missing required attribute",
                )
            })?
        } else {
            converted
        };
        check_finite(kind, layer, fid, decl.name, &value)?;
        values.insert(decl.name.to_string(), value);
    }

    for (column, raw) in &feature.attributes {
        match Value::from_field(raw) {
            Some(value) => {
                check_finite(kind, layer, fid, column, &value)?;
                values.insert(column.clone(), value);
            }
            None => warn!(layer, column = %column, fid, "Dropping binary column"),
        }
    }

    let geometry = match schema.geometry {
        GeometryKind::None => None,
        expected => Some(validate_geometry(kind, layer, fid, expected, feature.geometry)?),
    };

    Ok(ExtractedRow {
        fid,
        values,
        geometry,
    })
}

fn validate_geometry(
    kind: ElementKind,
    layer: &str,
    fid: i64,
    expected: GeometryKind,
    geometry: Option<Geometry>,
) -> Result<Geometry> {
    let mismatch = |reason: String| ModelError::mismatch(kind, layer, Some(fid), Some("geometry"), reason);

    let geometry = geometry.ok_or_else(|| mismatch("missing geometry".to_string()))?;
    let parts = geometry.part_count();
    let single = geometry
        .into_single_part()
        .ok_or_else(|| mismatch(format!("multi-part geometry with {} parts", parts)))?;

    if !geometry_matches(expected, single.geometry_type()) {
        return Err(mismatch(format!(
            "got {:?}, expected {:?}",
            single.geometry_type(),
            expected
        )));
    }
    Ok(single)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geopackage::{Coord, FieldValue};

    fn point_layer(name: &str) -> LayerInfo {
        LayerInfo {
            table_name: name.to_string(),
            data_type: "features".to_string(),
            srs_id: Some(28992),
            geometry_column: Some("geom".to_string()),
            geometry_type: Some(GeometryType::Point),
        }
    }

    fn feature(fid: i64, attrs: &[(&str, FieldValue)], geometry: Option<Geometry>) -> Feature {
        Feature {
            fid,
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            geometry,
        }
    }

    #[test]
    fn test_parse_layer_name() {
        let parsed = LayerName::parse("timmlHeadWell:north").unwrap();
        assert_eq!(parsed.kind, "HeadWell");
        assert_eq!(parsed.name, "north");
        assert!(!parsed.associated);

        let spaced = LayerName::parse("timml Head Well:north").unwrap();
        assert_eq!(spaced.kind, "Head Well");

        let assoc = LayerName::parse("timmlPolygonInhomProperties:a").unwrap();
        assert!(assoc.associated);
        assert_eq!(assoc.kind, "PolygonInhom");

        assert!(LayerName::parse("gpkg_contents").is_none());
        assert!(LayerName::parse("ttim Well:a").is_none());
    }

    #[test]
    fn test_defaults_applied() {
        let layer = point_layer("timmlWell:w");
        let table = validate_layer(
            ElementKind::Well,
            &layer,
            "w",
            Crs::undefined(),
            vec![feature(
                1,
                &[("discharge", FieldValue::Integer(100))],
                Some(Geometry::Point(Coord::new(1.0, 2.0))),
            )],
        )
        .unwrap();
        let row = &table.rows[0];
        assert_eq!(row.get("discharge"), &Value::Float(100.0));
        assert_eq!(row.get("radius"), &Value::Float(0.1));
        assert_eq!(row.get("layer"), &Value::Integer(0));
        assert_eq!(row.get("label"), &Value::Text(String::new()));
    }

    #[test]
    fn test_missing_required_attribute() {
        let layer = point_layer("timmlWell:w");
        let err = validate_layer(
            ElementKind::Well,
            &layer,
            "w",
            Crs::undefined(),
            vec![feature(
                7,
                &[("discharge", FieldValue::Null)],
                Some(Geometry::Point(Coord::new(0.0, 0.0))),
            )],
        )
        .unwrap_err();
        match err {
            ModelError::SchemaMismatch {
                kind,
                row,
                attribute,
                ..
            } => {
                assert_eq!(kind, ElementKind::Well);
                assert_eq!(row, Some(7));
                assert_eq!(attribute.as_deref(), Some("discharge"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_columns_carried() {
        let layer = point_layer("timmlWell:w");
        let table = validate_layer(
            ElementKind::Well,
            &layer,
            "w",
            Crs::undefined(),
            vec![feature(
                1,
                &[
                    ("discharge", FieldValue::Real(5.0)),
                    ("owner", FieldValue::Text("farm".into())),
                ],
                Some(Geometry::Point(Coord::new(0.0, 0.0))),
            )],
        )
        .unwrap();
        assert_eq!(table.rows[0].get("owner"), &Value::Text("farm".into()));
    }

    #[test]
    fn test_infinite_values_rejected() {
        let layer = point_layer("timmlWell:w");
        let validate = |attrs: &[(&str, FieldValue)]| {
            validate_layer(
                ElementKind::Well,
                &layer,
                "w",
                Crs::undefined(),
                vec![feature(3, attrs, Some(Geometry::Point(Coord::new(0.0, 0.0))))],
            )
        };

        let err = validate(&[("discharge", FieldValue::Real(f64::INFINITY))]).unwrap_err();
        assert!(err.to_string().contains("non-finite"), "{err}");
        assert!(matches!(err, ModelError::SchemaMismatch { attribute: Some(a), .. } if a == "discharge"));

        let err = validate(&[
            ("discharge", FieldValue::Real(5.0)),
            ("depth", FieldValue::Text("-inf".into())),
            ("weight", FieldValue::Real(f64::NEG_INFINITY)),
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { attribute: Some(a), .. } if a == "weight"));

        let err = validate(&[("discharge", FieldValue::Text("inf".into()))]).unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { attribute: Some(a), .. } if a == "discharge"));
    }

    #[test]
    fn test_wrong_geometry_kind() {
        let layer = point_layer("timmlWell:w");
        let err = validate_layer(
            ElementKind::Well,
            &layer,
            "w",
            Crs::undefined(),
            vec![feature(
                1,
                &[("discharge", FieldValue::Real(5.0))],
                Some(Geometry::LineString(vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)])),
            )],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::SchemaMismatch { attribute: Some(a), .. } if a == "geometry"));
    }

    #[test]
    fn test_multipoint_two_parts_rejected() {
        let layer = point_layer("timmlWell:w");
        let err = validate_layer(
            ElementKind::Well,
            &layer,
            "w",
            Crs::undefined(),
            vec![feature(
                1,
                &[("discharge", FieldValue::Real(5.0))],
                Some(Geometry::MultiPoint(vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0)])),
            )],
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 parts"));
    }
}
