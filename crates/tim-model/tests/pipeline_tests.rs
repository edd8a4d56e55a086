//! Extraction, specification and translation against real GeoPackage files.

use std::path::Path;

use test_utils::fixtures::{
    self, aquifer_table, constant_table, head_line_sink_table, observation_table, well_table,
};
use test_utils::{cells, wkb, GeoPackageBuilder, LayerFixture};
use tim_model::{
    build, extract, to_script, translate, Element, ElementKind, ModelError, TopBoundary, Value,
};

async fn run_pipeline(builder: GeoPackageBuilder) -> Result<Vec<Element>, ModelError> {
    let (_dir, path) = builder.write_temp("model.gpkg").await.unwrap();
    let tables = extract(&path).await?;
    let spec = build(tables, 100.0)?;
    translate(&spec)
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_extract_constant_head_model() {
    let (_dir, path) = fixtures::constant_head_model()
        .write_temp("model.gpkg")
        .await
        .unwrap();
    let tables = extract(&path).await.unwrap();

    assert_eq!(tables.len(), 3);
    let constant = &tables["timmlConstant:constant"];
    assert_eq!(constant.kind, ElementKind::Constant);
    assert_eq!(constant.name, "constant");
    assert_eq!(constant.rows[0].get("head"), &Value::Float(10.0));
    assert_eq!(constant.crs.authority(), Some("EPSG:28992".to_string()));
}

#[tokio::test]
async fn test_extract_ignores_foreign_layers() {
    let builder = fixtures::constant_head_model().layer(
        LayerFixture::attributes("notes").column("text", "TEXT").row(cells!["hello"]),
    );
    let (_dir, path) = builder.write_temp("model.gpkg").await.unwrap();
    let tables = extract(&path).await.unwrap();
    assert!(!tables.contains_key("notes"));
}

#[tokio::test]
async fn test_extract_unknown_kind() {
    let builder = fixtures::constant_head_model().layer(
        LayerFixture::features("timmlBorehole:b", "POINT").feature(wkb::point(0.0, 0.0), vec![]),
    );
    let (_dir, path) = builder.write_temp("model.gpkg").await.unwrap();
    let err = extract(&path).await.unwrap_err();
    assert!(matches!(err, ModelError::UnknownKind { kind, .. } if kind == "Borehole"));
}

#[tokio::test]
async fn test_well_missing_discharge_is_schema_mismatch() {
    let builder = fixtures::constant_head_model().layer(
        well_table("w").feature(
            wkb::point(100.0, 100.0),
            cells![None::<f64>, 0.1, 0.0, 0i64, "w1"],
        ),
    );
    let (_dir, path) = builder.write_temp("model.gpkg").await.unwrap();
    let err = extract(&path).await.unwrap_err();

    match &err {
        ModelError::SchemaMismatch {
            kind, attribute, ..
        } => {
            assert_eq!(*kind, ElementKind::Well);
            assert_eq!(attribute.as_deref(), Some("discharge"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("well"));
    assert!(msg.contains("discharge"));
}

#[tokio::test]
async fn test_missing_dataset() {
    let err = extract(Path::new("/no/such/model.gpkg")).await.unwrap_err();
    assert!(matches!(err, ModelError::Dataset(_)));
}

// ============================================================================
// Aquifer stack
// ============================================================================

#[tokio::test]
async fn test_two_conductivity_rows_inconsistent() {
    let aquifer = aquifer_table("aquifer")
        .row(cells![10.0, None::<f64>, 0.0, -5.0, 0.3, None::<f64>])
        .row(cells![20.0, None::<f64>, -6.0, -20.0, 0.3, None::<f64>]);
    let builder = GeoPackageBuilder::new()
        .layer(aquifer)
        .layer(fixtures::domain(0.0, 100.0, 0.0, 100.0));
    let err = run_pipeline(builder).await.unwrap_err();
    assert!(matches!(err, ModelError::InconsistentStack { .. }));
}

#[tokio::test]
async fn test_stack_ending_in_resistance_inconsistent() {
    let aquifer = aquifer_table("aquifer")
        .row(cells![10.0, None::<f64>, 0.0, -5.0, 0.3, None::<f64>])
        .row(cells![None::<f64>, 100.0, -5.0, -6.0, 0.3, None::<f64>]);
    let builder = GeoPackageBuilder::new()
        .layer(aquifer)
        .layer(fixtures::domain(0.0, 100.0, 0.0, 100.0));
    let err = run_pipeline(builder).await.unwrap_err();
    assert!(matches!(err, ModelError::InconsistentStack { .. }));
}

#[tokio::test]
async fn test_semi_confined_stack() {
    let aquifer = aquifer_table("aquifer")
        .row(cells![None::<f64>, 500.0, 2.0, 0.0, 0.3, 1.5])
        .row(cells![5.0, None::<f64>, 0.0, -10.0, 0.3, None::<f64>]);
    let builder = GeoPackageBuilder::new()
        .layer(aquifer)
        .layer(fixtures::domain(0.0, 100.0, 0.0, 100.0));
    let elements = run_pipeline(builder).await.unwrap();
    match &elements[1] {
        Element::Aquifer(stack) => {
            assert_eq!(stack.top_boundary(), TopBoundary::SemiConfined { hstar: 1.5 });
            assert_eq!(stack.naq(), 1);
        }
        other => panic!("expected aquifer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_constant_conflicts_with_semi_confined_top() {
    let aquifer = aquifer_table("aquifer")
        .row(cells![None::<f64>, 500.0, 2.0, 0.0, 0.3, 1.5])
        .row(cells![5.0, None::<f64>, 0.0, -10.0, 0.3, None::<f64>]);
    let builder = GeoPackageBuilder::new()
        .layer(aquifer)
        .layer(fixtures::domain(0.0, 100.0, 0.0, 100.0))
        .layer(fixtures::constant(50.0, 50.0, 1.0));
    let err = run_pipeline(builder).await.unwrap_err();
    match &err {
        ModelError::ConflictingElement(msg) => assert!(msg.contains("semi-confined"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Translation
// ============================================================================

#[tokio::test]
async fn test_translation_order() {
    let builder = fixtures::well_model(100.0)
        .layer(head_line_sink_table("river").feature(
            wkb::line(&[(0.0, 900.0), (500.0, 900.0), (1000.0, 900.0)]),
            cells![8.0, 1.0, 2.0, 0i64, 0i64, "river"],
        ));
    let elements = run_pipeline(builder).await.unwrap();
    let kinds: Vec<_> = elements.iter().map(Element::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Domain,
            ElementKind::Aquifer,
            ElementKind::Constant,
            ElementKind::Well,
            ElementKind::HeadLineSink,
        ]
    );
    match &elements[4] {
        Element::HeadLineSink(ls) => {
            assert_eq!(ls.xy.len(), 3);
            assert_eq!(ls.hls, 8.0);
            assert_eq!(ls.res, 1.0);
            assert_eq!(ls.wh, 2.0);
        }
        other => panic!("expected head line sink, got {other:?}"),
    }
}

#[tokio::test]
async fn test_observations_translated_last() {
    let builder = GeoPackageBuilder::new()
        .layer(observation_table("piezometers").feature(wkb::point(100.0, 200.0), cells!["pb1"]))
        .layer(fixtures::single_aquifer())
        .layer(fixtures::domain(0.0, 1000.0, 0.0, 1000.0))
        .layer(fixtures::constant(500.0, 500.0, 10.0));
    let elements = run_pipeline(builder).await.unwrap();
    assert_eq!(elements.len(), 4);
    match &elements[3] {
        Element::Observation(o) => {
            assert_eq!((o.x, o.y), (100.0, 200.0));
            assert_eq!(o.label, "pb1");
        }
        other => panic!("expected observation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_two_constants_conflict() {
    let builder = fixtures::constant_head_model().layer(
        constant_table("second").feature(wkb::point(1.0, 1.0), cells![5.0, 0i64, ""]),
    );
    let err = run_pipeline(builder).await.unwrap_err();
    assert!(matches!(err, ModelError::ConflictingElement(_)));
}

#[tokio::test]
async fn test_polygon_inhomogeneity_unsupported() {
    let inhom = LayerFixture::features("timmlPolygonInhom:area", "POLYGON")
        .column("conductivity", "REAL")
        .column("top", "REAL")
        .column("bottom", "REAL")
        .feature(
            wkb::polygon(&wkb::rectangle(100.0, 200.0, 100.0, 200.0)),
            cells![1.0, 0.0, -10.0],
        );
    let err = run_pipeline(fixtures::constant_head_model().layer(inhom))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::UnsupportedKind {
            kind: ElementKind::PolygonInhom,
            ..
        }
    ));
}

#[tokio::test]
async fn test_empty_polygon_inhomogeneity_ignored() {
    let inhom = LayerFixture::features("timmlPolygonInhom:area", "POLYGON")
        .column("conductivity", "REAL")
        .column("top", "REAL")
        .column("bottom", "REAL");
    let elements = run_pipeline(fixtures::constant_head_model().layer(inhom))
        .await
        .unwrap();
    assert_eq!(elements.len(), 3);
}

#[tokio::test]
async fn test_pipeline_deterministic() {
    let (_dir, path) = fixtures::well_model(250.0)
        .write_temp("model.gpkg")
        .await
        .unwrap();

    let first = build(extract(&path).await.unwrap(), 50.0).unwrap();
    let second = build(extract(&path).await.unwrap(), 50.0).unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(translate(&first).unwrap(), translate(&second).unwrap());
}

#[tokio::test]
async fn test_script_export() {
    let (_dir, path) = fixtures::well_model(100.0)
        .write_temp("model.gpkg")
        .await
        .unwrap();
    let spec = build(extract(&path).await.unwrap(), 100.0).unwrap();
    let elements = translate(&spec).unwrap();
    let script = to_script(&spec, &elements);

    assert!(script.starts_with("import numpy as np\nimport timml\n"));
    assert!(script.contains(
        "model = timml.ModelMaq(kaq=[5.0], z=[0.0, -10.0], c=[], npor=[0.3], topboundary=\"conf\", hstar=None)"
    ));
    assert!(script.contains("constant_0 = timml.Constant(model=model, xr=500.0, yr=500.0, hr=10.0"));
    assert!(script.contains("well_0 = timml.Well(model=model, xw=250.0, yw=250.0, Qw=100.0"));
    assert!(script.contains("model.solve()"));
    assert!(script.contains("xg = np.arange(0.0, 1000.0, 100.0) + 0.5 * 100.0"));
    assert!(script.contains("yg = np.arange(1000.0, 0.0, -100.0) - 0.5 * 100.0"));
    assert!(!script.contains("observation_"));
}

#[tokio::test]
async fn test_script_export_samples_observations() {
    let builder = fixtures::constant_head_model()
        .layer(observation_table("piezometers").feature(wkb::point(100.0, 200.0), cells!["pb1"]));
    let (_dir, path) = builder.write_temp("model.gpkg").await.unwrap();
    let spec = build(extract(&path).await.unwrap(), 100.0).unwrap();
    let script = to_script(&spec, &translate(&spec).unwrap());

    let solve = script.find("model.solve()").unwrap();
    let sample = script
        .find("observation_0 = model.head(x=100.0, y=200.0)")
        .unwrap();
    assert!(sample > solve);
    assert!(!script.contains("timml.Observation"));
}
