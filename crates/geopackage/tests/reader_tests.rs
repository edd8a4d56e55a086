//! Integration tests reading GeoPackages written by the test fixtures.

use geopackage::{Coord, FieldValue, GeoPackage, Geometry, GeometryType};
use test_utils::{cells, fixtures, wkb, GeoPackageBuilder, LayerFixture, RD_NEW_SRS_ID};

#[tokio::test]
async fn test_layers_sorted_with_geometry_columns() {
    let (_dir, path) = fixtures::constant_head_model()
        .write_temp("model.gpkg")
        .await
        .unwrap();
    let gpkg = GeoPackage::open(&path).await.unwrap();
    let layers = gpkg.layers().await.unwrap();

    let names: Vec<&str> = layers.iter().map(|l| l.table_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["timmlAquifer:aquifer", "timmlConstant:constant", "timmlDomain:domain"]
    );
    assert!(!layers[0].has_geometry());
    assert_eq!(layers[0].data_type, "attributes");
    assert_eq!(layers[1].geometry_type, Some(GeometryType::Point));
    assert_eq!(layers[2].geometry_type, Some(GeometryType::Polygon));
    assert_eq!(layers[2].srs_id, Some(RD_NEW_SRS_ID));
}

#[tokio::test]
async fn test_read_layer_values_and_geometry() {
    let (_dir, path) = fixtures::constant_head_model()
        .write_temp("model.gpkg")
        .await
        .unwrap();
    let gpkg = GeoPackage::open(&path).await.unwrap();
    let layers = gpkg.layers().await.unwrap();
    let constant = layers
        .iter()
        .find(|l| l.table_name == "timmlConstant:constant")
        .unwrap();

    let features = gpkg.read_layer(constant).await.unwrap();
    assert_eq!(features.len(), 1);
    let feature = &features[0];
    assert_eq!(feature.fid, 1);
    assert_eq!(feature.attributes.get("head"), Some(&FieldValue::Real(10.0)));
    assert_eq!(feature.attributes.get("layer"), Some(&FieldValue::Integer(0)));
    assert_eq!(
        feature.attributes.get("label"),
        Some(&FieldValue::Text("reference".to_string()))
    );
    assert!(!feature.attributes.contains_key("fid"));
    assert!(!feature.attributes.contains_key("geom"));
    assert_eq!(
        feature.geometry,
        Some(Geometry::Point(Coord::new(500.0, 500.0)))
    );
}

#[tokio::test]
async fn test_rows_in_rowid_order_with_nulls() {
    let layer = LayerFixture::features("timmlWell:w", "POINT")
        .column("discharge", "REAL")
        .feature(wkb::point(0.0, 0.0), cells![3.0])
        .feature(wkb::point(1.0, 0.0), cells![None::<f64>])
        .feature(wkb::point(2.0, 0.0), cells![1.0]);
    let (_dir, path) = GeoPackageBuilder::new()
        .layer(layer)
        .write_temp("w.gpkg")
        .await
        .unwrap();

    let gpkg = GeoPackage::open(&path).await.unwrap();
    let layers = gpkg.layers().await.unwrap();
    let features = gpkg.read_layer(&layers[0]).await.unwrap();

    let fids: Vec<i64> = features.iter().map(|f| f.fid).collect();
    assert_eq!(fids, vec![1, 2, 3]);
    assert_eq!(features[1].attributes["discharge"], FieldValue::Null);
    assert_eq!(
        features[2].geometry,
        Some(Geometry::Point(Coord::new(2.0, 0.0)))
    );
}

#[tokio::test]
async fn test_spatial_ref_lookup() {
    let (_dir, path) = fixtures::constant_head_model()
        .write_temp("model.gpkg")
        .await
        .unwrap();
    let gpkg = GeoPackage::open(&path).await.unwrap();

    let crs = gpkg.spatial_ref(RD_NEW_SRS_ID).await.unwrap();
    assert_eq!(crs.authority(), Some("EPSG:28992".to_string()));
    assert!(crs.wkt.contains("Amersfoort"));

    let unknown = gpkg.spatial_ref(12345).await.unwrap();
    assert!(unknown.is_undefined());
}

#[tokio::test]
async fn test_multipolygon_single_part() {
    let ring = wkb::rectangle(0.0, 10.0, 0.0, 5.0);
    let layer = LayerFixture::features("timmlDomain:d", "MULTIPOLYGON")
        .feature(wkb::multi(6, &[wkb::polygon(&ring)]), vec![]);
    let (_dir, path) = GeoPackageBuilder::new()
        .layer(layer)
        .write_temp("d.gpkg")
        .await
        .unwrap();

    let gpkg = GeoPackage::open(&path).await.unwrap();
    let layers = gpkg.layers().await.unwrap();
    let features = gpkg.read_layer(&layers[0]).await.unwrap();
    let geometry = features[0].geometry.clone().unwrap();
    assert_eq!(geometry.geometry_type(), GeometryType::MultiPolygon);
    let single = geometry.into_single_part().unwrap();
    assert_eq!(single.bbox().unwrap().extent(), (0.0, 10.0, 0.0, 5.0));
}
