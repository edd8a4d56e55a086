//! Immutable model specification assembled from extracted tables.

use std::collections::BTreeMap;

use serde::Serialize;
use tim_common::{BoundingBox, Crs};
use tracing::{debug, info};

use crate::aquifer::{AquiferRow, AquiferStack};
use crate::error::{ModelError, Result};
use crate::extract::ExtractedTable;
use crate::schema::ElementKind;
use crate::value::Value;

/// Everything needed to build, solve and grid one model.
///
/// Constructed once per request by [`build`] and never mutated.
#[derive(Debug, Clone)]
pub struct ModelSpecification {
    aquifer: AquiferStack,
    elements: BTreeMap<ElementKind, Vec<ExtractedTable>>,
    domain: BoundingBox,
    cellsize: f64,
    crs: Crs,
    fingerprint: String,
    model_fingerprint: String,
}

impl ModelSpecification {
    pub fn aquifer(&self) -> &AquiferStack {
        &self.aquifer
    }

    /// Element tables per kind, each list in layer-name order.
    pub fn elements(&self) -> &BTreeMap<ElementKind, Vec<ExtractedTable>> {
        &self.elements
    }

    /// Tables of one kind; empty when the dataset has none.
    pub fn tables(&self, kind: ElementKind) -> &[ExtractedTable] {
        self.elements.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bounding box of the domain polygon (not rounded to the cellsize).
    pub fn domain(&self) -> BoundingBox {
        self.domain
    }

    pub fn cellsize(&self) -> f64 {
        self.cellsize
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Hash over every input, including domain and cellsize.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Hash over the inputs that determine the solved model only.
    pub fn model_fingerprint(&self) -> &str {
        &self.model_fingerprint
    }
}

/// Inputs that determine the solved model.
#[derive(Serialize)]
struct ModelInputs<'a> {
    aquifer: &'a [AquiferRow],
    elements: BTreeMap<ElementKind, &'a Vec<ExtractedTable>>,
}

/// Inputs that determine the gridded output.
#[derive(Serialize)]
struct OutputInputs<'a> {
    model: &'a str,
    observations: &'a [ExtractedTable],
    domain: BoundingBox,
    cellsize: f64,
    crs: &'a Crs,
}

/// Assemble a specification from extracted tables.
pub fn build(tables: BTreeMap<String, ExtractedTable>, cellsize: f64) -> Result<ModelSpecification> {
    if !cellsize.is_finite() || cellsize <= 0.0 {
        return Err(ModelError::InvalidCellsize(cellsize));
    }

    let mut aquifer_tables = Vec::new();
    let mut domain_tables = Vec::new();
    let mut elements: BTreeMap<ElementKind, Vec<ExtractedTable>> = BTreeMap::new();

    // BTreeMap iteration keeps every per-kind list in layer-name order.
    for table in tables.into_values() {
        match table.kind {
            ElementKind::Aquifer => aquifer_tables.push(table),
            ElementKind::Domain => domain_tables.push(table),
            kind => elements.entry(kind).or_default().push(table),
        }
    }

    let aquifer_table = match aquifer_tables.len() {
        0 => return Err(ModelError::stack(None, "no aquifer table")),
        1 => aquifer_tables.remove(0),
        _ => {
            let names: Vec<_> = aquifer_tables.iter().map(|t| t.layer.as_str()).collect();
            return Err(ModelError::stack(
                None,
                format!("multiple aquifer tables: {}", names.join(", ")),
            ));
        }
    };
    let aquifer = AquiferStack::from_table(&aquifer_table)?;

    if domain_tables.len() > 1 {
        let names: Vec<_> = domain_tables.iter().map(|t| t.layer.as_str()).collect();
        return Err(ModelError::ConflictingElement(format!(
            "multiple domain tables: {}",
            names.join(", ")
        )));
    }
    let domain_table = domain_tables
        .pop()
        .ok_or_else(|| ModelError::EmptyDomain("no domain table".to_string()))?;
    let domain = domain_table
        .rows
        .first()
        .and_then(|row| row.geometry.as_ref())
        .and_then(|geometry| geometry.bbox())
        .ok_or_else(|| {
            ModelError::EmptyDomain(format!("layer '{}' has no features", domain_table.layer))
        })?;
    if domain.is_degenerate() {
        return Err(ModelError::EmptyDomain(format!(
            "domain extent {:?} has no area",
            domain.extent()
        )));
    }

    check_layers(&elements, aquifer.naq())?;

    // Observations are sampled after the solve and leave the model untouched.
    let model_fingerprint = hash_json(&ModelInputs {
        aquifer: aquifer.rows(),
        elements: elements
            .iter()
            .filter(|(kind, _)| **kind != ElementKind::Observation)
            .map(|(kind, tables)| (*kind, tables))
            .collect(),
    })?;
    let fingerprint = hash_json(&OutputInputs {
        model: &model_fingerprint,
        observations: elements
            .get(&ElementKind::Observation)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        domain,
        cellsize,
        crs: &domain_table.crs,
    })?;

    info!(
        naq = aquifer.naq(),
        element_tables = elements.values().map(Vec::len).sum::<usize>(),
        cellsize,
        fingerprint = %fingerprint,
        "Built model specification"
    );

    Ok(ModelSpecification {
        aquifer,
        elements,
        domain,
        cellsize,
        crs: domain_table.crs,
        fingerprint,
        model_fingerprint,
    })
}

/// Every `layer` attribute must refer to an existing aquifer.
fn check_layers(elements: &BTreeMap<ElementKind, Vec<ExtractedTable>>, naq: usize) -> Result<()> {
    for (kind, tables) in elements {
        for table in tables {
            for row in &table.rows {
                if let Value::Integer(layer) = row.get("layer") {
                    if *layer < 0 || *layer as usize >= naq {
                        return Err(ModelError::LayerOutOfRange {
                            kind: *kind,
                            layer: table.layer.clone(),
                            row: row.fid,
                            value: *layer,
                            naq,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// BLAKE3 over canonical JSON, hex encoded.
///
/// `serde_json` objects are ordered maps and floats print in shortest
/// round-trip form, so equal inputs always hash equal.
pub fn hash_json<T: Serialize>(value: &T) -> Result<String> {
    let canonical = serde_json::to_vec(&serde_json::to_value(value)?)?;
    let hash = blake3::hash(&canonical);
    debug!(bytes = canonical.len(), "Hashed canonical JSON");
    Ok(hash.to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedRow;
    use geopackage::{Coord, Geometry};

    fn table(kind: ElementKind, layer: &str, rows: Vec<ExtractedRow>) -> ExtractedTable {
        ExtractedTable {
            kind,
            layer: layer.to_string(),
            name: layer.split(':').nth(1).unwrap_or("").to_string(),
            crs: Crs::undefined(),
            rows,
        }
    }

    fn row(fid: i64, values: &[(&str, Value)], geometry: Option<Geometry>) -> ExtractedRow {
        ExtractedRow {
            fid,
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            geometry,
        }
    }

    fn aquifer_table() -> ExtractedTable {
        table(
            ElementKind::Aquifer,
            "timmlAquifer:aquifer",
            vec![row(
                1,
                &[
                    ("conductivity", Value::Float(5.0)),
                    ("resistance", Value::Null),
                    ("top", Value::Float(0.0)),
                    ("bottom", Value::Float(-10.0)),
                    ("porosity", Value::Float(0.3)),
                    ("headtop", Value::Null),
                ],
                None,
            )],
        )
    }

    fn domain_table() -> ExtractedTable {
        let ring = vec![
            Coord::new(0.0, 0.0),
            Coord::new(1000.0, 0.0),
            Coord::new(1000.0, 1000.0),
            Coord::new(0.0, 1000.0),
            Coord::new(0.0, 0.0),
        ];
        table(
            ElementKind::Domain,
            "timmlDomain:domain",
            vec![row(1, &[], Some(Geometry::Polygon(vec![ring])))],
        )
    }

    fn well_table(layer: i64) -> ExtractedTable {
        table(
            ElementKind::Well,
            "timmlWell:w",
            vec![row(
                4,
                &[
                    ("discharge", Value::Float(100.0)),
                    ("layer", Value::Integer(layer)),
                ],
                Some(Geometry::Point(Coord::new(1.0, 1.0))),
            )],
        )
    }

    fn tables(extra: Vec<ExtractedTable>) -> BTreeMap<String, ExtractedTable> {
        let mut map = BTreeMap::new();
        for t in [aquifer_table(), domain_table()].into_iter().chain(extra) {
            map.insert(t.layer.clone(), t);
        }
        map
    }

    #[test]
    fn test_build_basic() {
        let spec = build(tables(vec![well_table(0)]), 100.0).unwrap();
        assert_eq!(spec.domain().extent(), (0.0, 1000.0, 0.0, 1000.0));
        assert_eq!(spec.aquifer().naq(), 1);
        assert_eq!(spec.tables(ElementKind::Well).len(), 1);
        assert!(spec.tables(ElementKind::Constant).is_empty());
        assert_eq!(spec.fingerprint().len(), 64);
    }

    #[test]
    fn test_missing_aquifer() {
        let mut map = tables(vec![]);
        map.remove("timmlAquifer:aquifer");
        assert!(matches!(
            build(map, 10.0),
            Err(ModelError::InconsistentStack { .. })
        ));
    }

    #[test]
    fn test_empty_domain() {
        let mut map = tables(vec![]);
        map.get_mut("timmlDomain:domain").unwrap().rows.clear();
        assert!(matches!(build(map, 10.0), Err(ModelError::EmptyDomain(_))));
    }

    #[test]
    fn test_invalid_cellsize() {
        assert!(matches!(
            build(tables(vec![]), 0.0),
            Err(ModelError::InvalidCellsize(_))
        ));
    }

    #[test]
    fn test_layer_out_of_range() {
        let err = build(tables(vec![well_table(1)]), 10.0).unwrap_err();
        assert!(matches!(
            err,
            ModelError::LayerOutOfRange { value: 1, naq: 1, row: 4, .. }
        ));
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = build(tables(vec![well_table(0)]), 100.0).unwrap();
        let b = build(tables(vec![well_table(0)]), 100.0).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.model_fingerprint(), b.model_fingerprint());

        let c = build(tables(vec![well_table(0)]), 50.0).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.model_fingerprint(), c.model_fingerprint());

        let d = build(tables(vec![]), 100.0).unwrap();
        assert_ne!(a.model_fingerprint(), d.model_fingerprint());
    }

    #[test]
    fn test_observations_leave_model_fingerprint() {
        let observation = table(
            ElementKind::Observation,
            "timmlObservation:piezometers",
            vec![row(
                1,
                &[("label", Value::Text("pb1".to_string()))],
                Some(Geometry::Point(Coord::new(10.0, 20.0))),
            )],
        );
        let plain = build(tables(vec![well_table(0)]), 100.0).unwrap();
        let observed = build(tables(vec![well_table(0), observation]), 100.0).unwrap();
        assert_eq!(plain.model_fingerprint(), observed.model_fingerprint());
        assert_ne!(plain.fingerprint(), observed.fingerprint());
    }

    #[test]
    fn test_hash_json_key_order_independent() {
        let mut first = BTreeMap::new();
        first.insert("b", 2.0);
        first.insert("a", 1.0);
        let second = serde_json::json!({"a": 1.0, "b": 2.0});
        assert_eq!(hash_json(&first).unwrap(), hash_json(&second).unwrap());
    }
}
