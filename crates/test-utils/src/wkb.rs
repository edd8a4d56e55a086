//! Little-endian WKB and GeoPackage geometry blob encoders.
//!
//! These write the minimal encodings a GIS front-end produces: 2D
//! coordinates, no envelope in the GeoPackage header.

fn header(out: &mut Vec<u8>, geometry_type: u32) {
    out.push(1);
    out.extend_from_slice(&geometry_type.to_le_bytes());
}

fn coords(out: &mut Vec<u8>, points: &[(f64, f64)]) {
    out.extend_from_slice(&(points.len() as u32).to_le_bytes());
    for (x, y) in points {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
}

/// WKB point.
pub fn point(x: f64, y: f64) -> Vec<u8> {
    let mut out = Vec::with_capacity(21);
    header(&mut out, 1);
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&y.to_le_bytes());
    out
}

/// WKB linestring.
pub fn line(points: &[(f64, f64)]) -> Vec<u8> {
    let mut out = Vec::new();
    header(&mut out, 2);
    coords(&mut out, points);
    out
}

/// WKB polygon with a single ring, stored exactly as given.
pub fn polygon(ring: &[(f64, f64)]) -> Vec<u8> {
    let mut out = Vec::new();
    header(&mut out, 3);
    out.extend_from_slice(&1u32.to_le_bytes());
    coords(&mut out, ring);
    out
}

/// Wrap single-part WKB bodies into a WKB multi geometry.
///
/// `geometry_type` is the multi type code (4, 5 or 6).
pub fn multi(geometry_type: u32, parts: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    header(&mut out, geometry_type);
    out.extend_from_slice(&(parts.len() as u32).to_le_bytes());
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

/// Closed axis-aligned rectangle ring, counter-clockwise from (xmin, ymin).
pub fn rectangle(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Vec<(f64, f64)> {
    vec![
        (xmin, ymin),
        (xmax, ymin),
        (xmax, ymax),
        (xmin, ymax),
        (xmin, ymin),
    ]
}

/// Closed regular polygon approximating a circle, first vertex due east.
pub fn circle(xc: f64, yc: f64, radius: f64, segments: usize) -> Vec<(f64, f64)> {
    let mut ring: Vec<(f64, f64)> = (0..segments)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / segments as f64;
            (xc + radius * theta.cos(), yc + radius * theta.sin())
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// GeoPackage geometry blob: `GP` header (little-endian, no envelope) + WKB.
pub fn gpkg_blob(srs_id: i32, wkb: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + wkb.len());
    out.extend_from_slice(b"GP");
    out.push(0);
    out.push(0x01);
    out.extend_from_slice(&srs_id.to_le_bytes());
    out.extend_from_slice(wkb);
    out
}
