//! Maps specification rows onto solver elements.

use geopackage::{Coord, Geometry};
use tracing::{debug, instrument};

use crate::element::{
    CircAreaSink, Constant, Element, HeadLineSink, HeadWell, ImpLineDoublet, LeakyLineDoublet,
    LineSinkDitch, Observation, UniformFlow, Well,
};
use crate::error::{ModelError, Result};
use crate::extract::{ExtractedRow, ExtractedTable};
use crate::schema::ElementKind;
use crate::spec::ModelSpecification;

/// Relative tolerance on squared radii for circular area sinks.
const CIRCULARITY_TOLERANCE: f64 = 0.01;

/// Row accessor that reports failures against its table.
struct RowView<'a> {
    table: &'a ExtractedTable,
    row: &'a ExtractedRow,
}

impl<'a> RowView<'a> {
    fn mismatch(&self, attribute: &str, reason: impl Into<String>) -> ModelError {
        ModelError::mismatch(
            self.table.kind,
            &self.table.layer,
            Some(self.row.fid),
            Some(attribute),
            reason,
        )
    }

    fn float(&self, name: &str) -> Result<f64> {
        self.row
            .get(name)
            .as_f64()
            .ok_or_else(|| self.mismatch(name, "expected a number"))
    }

    fn integer(&self, name: &str) -> Result<i64> {
        self.row
            .get(name)
            .as_i64()
            .ok_or_else(|| self.mismatch(name, "expected an integer"))
    }

    fn text(&self, name: &str) -> String {
        self.row.get(name).as_str().unwrap_or_default().to_string()
    }

    fn point(&self) -> Result<(f64, f64)> {
        match &self.row.geometry {
            Some(Geometry::Point(c)) => Ok((c.x, c.y)),
            _ => Err(self.mismatch("geometry", "expected a point")),
        }
    }

    fn line(&self) -> Result<Vec<Coord>> {
        match &self.row.geometry {
            Some(Geometry::LineString(line)) if line.len() >= 2 => Ok(line.clone()),
            Some(Geometry::LineString(_)) => {
                Err(self.mismatch("geometry", "line needs at least two vertices"))
            }
            _ => Err(self.mismatch("geometry", "expected a line")),
        }
    }

    fn exterior(&self) -> Result<Vec<Coord>> {
        match &self.row.geometry {
            Some(Geometry::Polygon(rings)) if !rings.is_empty() => Ok(rings[0].clone()),
            _ => Err(self.mismatch("geometry", "expected a polygon")),
        }
    }
}

fn rows(tables: &[ExtractedTable]) -> impl Iterator<Item = RowView<'_>> {
    tables
        .iter()
        .flat_map(|table| table.rows.iter().map(move |row| RowView { table, row }))
}

/// Translate a specification into solver elements.
///
/// Order: domain, aquifer, constant, uniform flow, area sinks, wells, head
/// wells, line sinks (head, ditch), line doublets (leaky, impermeable),
/// observations.
#[instrument(skip_all, fields(fingerprint = %spec.fingerprint()))]
pub fn translate(spec: &ModelSpecification) -> Result<Vec<Element>> {
    if let Some(table) = spec
        .tables(ElementKind::PolygonInhom)
        .iter()
        .find(|t| !t.is_empty())
    {
        return Err(ModelError::UnsupportedKind {
            kind: ElementKind::PolygonInhom,
            layer: table.layer.clone(),
        });
    }

    let mut elements = vec![
        Element::Domain(spec.domain()),
        Element::Aquifer(spec.aquifer().clone()),
    ];

    if let Some(constant) = constant(spec)? {
        elements.push(Element::Constant(constant));
    }
    if let Some(uflow) = uniform_flow(spec)? {
        elements.push(Element::UniformFlow(uflow));
    }

    for view in rows(spec.tables(ElementKind::CircAreaSink)) {
        elements.push(Element::CircAreaSink(circ_area_sink(&view)?));
    }
    for view in rows(spec.tables(ElementKind::Well)) {
        let (xw, yw) = view.point()?;
        elements.push(Element::Well(Well {
            xw,
            yw,
            qw: view.float("discharge")?,
            rw: view.float("radius")?,
            res: view.float("resistance")?,
            layer: view.integer("layer")?,
            label: view.text("label"),
        }));
    }
    for view in rows(spec.tables(ElementKind::HeadWell)) {
        let (xw, yw) = view.point()?;
        elements.push(Element::HeadWell(HeadWell {
            xw,
            yw,
            hw: view.float("head")?,
            rw: view.float("radius")?,
            res: view.float("resistance")?,
            layer: view.integer("layer")?,
            label: view.text("label"),
        }));
    }
    for view in rows(spec.tables(ElementKind::HeadLineSink)) {
        elements.push(Element::HeadLineSink(HeadLineSink {
            xy: view.line()?,
            hls: view.float("head")?,
            res: view.float("resistance")?,
            wh: view.float("width")?,
            order: view.integer("order")?,
            layer: view.integer("layer")?,
            label: view.text("label"),
        }));
    }
    for view in rows(spec.tables(ElementKind::LineSinkDitch)) {
        elements.push(Element::LineSinkDitch(LineSinkDitch {
            xy: view.line()?,
            qls: view.float("discharge")?,
            res: view.float("resistance")?,
            wh: view.float("width")?,
            order: view.integer("order")?,
            layer: view.integer("layer")?,
            label: view.text("label"),
        }));
    }
    for view in rows(spec.tables(ElementKind::LeakyLineDoublet)) {
        elements.push(Element::LeakyLineDoublet(LeakyLineDoublet {
            xy: view.line()?,
            res: view.float("resistance")?,
            order: view.integer("order")?,
            layer: view.integer("layer")?,
            label: view.text("label"),
        }));
    }
    for view in rows(spec.tables(ElementKind::ImpLineDoublet)) {
        elements.push(Element::ImpLineDoublet(ImpLineDoublet {
            xy: view.line()?,
            order: view.integer("order")?,
            layer: view.integer("layer")?,
            label: view.text("label"),
        }));
    }

    elements.extend(observations(spec)?.into_iter().map(Element::Observation));

    debug!(elements = elements.len(), "Translated model");
    Ok(elements)
}

/// Observation points in layer-name then row order.
pub fn observations(spec: &ModelSpecification) -> Result<Vec<Observation>> {
    rows(spec.tables(ElementKind::Observation))
        .map(|view| {
            let (x, y) = view.point()?;
            Ok(Observation {
                x,
                y,
                label: view.text("label"),
            })
        })
        .collect()
}

fn constant(spec: &ModelSpecification) -> Result<Option<Constant>> {
    let views: Vec<_> = rows(spec.tables(ElementKind::Constant)).collect();
    let Some(view) = views.first() else {
        return Ok(None);
    };
    if views.len() > 1 {
        return Err(ModelError::ConflictingElement(format!(
            "{} constant rows given, only one reference head is allowed",
            views.len()
        )));
    }
    if spec.aquifer().is_semi_confined() {
        return Err(ModelError::ConflictingElement(format!(
            "constant in layer '{}' conflicts with the semi-confined top",
            view.table.layer
        )));
    }

    let (xr, yr) = view.point()?;
    Ok(Some(Constant {
        xr,
        yr,
        hr: view.float("head")?,
        layer: view.integer("layer")?,
        label: view.text("label"),
    }))
}

fn uniform_flow(spec: &ModelSpecification) -> Result<Option<UniformFlow>> {
    let views: Vec<_> = rows(spec.tables(ElementKind::UniformFlow)).collect();
    let Some(view) = views.first() else {
        return Ok(None);
    };
    if views.len() > 1 {
        return Err(ModelError::ConflictingElement(format!(
            "{} uniform flow rows given, only one is allowed",
            views.len()
        )));
    }
    Ok(Some(UniformFlow {
        slope: view.float("slope")?,
        angle: view.float("angle")?,
        label: view.text("label"),
    }))
}

fn circ_area_sink(view: &RowView<'_>) -> Result<CircAreaSink> {
    let ring = view.exterior()?;
    let open: &[Coord] = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => &ring,
    };
    if open.len() < 3 {
        return Err(view.mismatch("geometry", "circle needs at least three vertices"));
    }

    let n = open.len() as f64;
    let xc = open.iter().map(|c| c.x).sum::<f64>() / n;
    let yc = open.iter().map(|c| c.y).sum::<f64>() / n;
    let squared = |c: &Coord| (c.x - xc).powi(2) + (c.y - yc).powi(2);

    let radius2 = squared(&open[0]);
    let tolerance = CIRCULARITY_TOLERANCE * radius2;
    if !(radius2 > 0.0) || open.iter().any(|c| (squared(c) - radius2).abs() > tolerance) {
        return Err(view.mismatch("geometry", "area sink geometry is not circular"));
    }

    Ok(CircAreaSink {
        xc,
        yc,
        r: radius2.sqrt(),
        n: view.float("rate")?,
        layer: view.integer("layer")?,
        label: view.text("label"),
    })
}
