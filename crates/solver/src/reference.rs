//! Single confined aquifer backend.
//!
//! Works in discharge potential `Φ = T·h` with `T = k·H`. Given-strength
//! elements (wells, uniform flow, area sinks, ditches) contribute directly;
//! head-specified elements (constant, head wells, head line sink segments)
//! add one unknown each, solved by collocation with a dense LU factorisation.

use nalgebra::{DMatrix, DVector};
use tim_model::element::{CircAreaSink, HeadLineSink, HeadWell, LineSinkDitch, UniformFlow, Well};
use tim_model::{AquiferStack, Element, TopBoundary};
use tracing::{debug, info};

use crate::error::{SolverError, SolverResult};
use crate::potential;
use crate::{SolvedModel, Solver};

/// Straight piece of a line sink.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl Segment {
    fn length(&self) -> f64 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }

    fn midpoint(&self) -> (f64, f64) {
        (0.5 * (self.x1 + self.x2), 0.5 * (self.y1 + self.y2))
    }

    fn potential(&self, x: f64, y: f64) -> f64 {
        potential::line_sink(x, y, self.x1, self.y1, self.x2, self.y2)
    }
}

fn segments(xy: &[tim_model::element::Coord]) -> Vec<Segment> {
    xy.windows(2)
        .map(|w| Segment {
            x1: w[0].x,
            y1: w[0].y,
            x2: w[1].x,
            y2: w[1].y,
        })
        .filter(|s| s.length() > 0.0)
        .collect()
}

/// A contribution with a fixed strength.
#[derive(Debug, Clone)]
enum Given {
    Well { xw: f64, yw: f64, rw: f64, q: f64 },
    Uniform { qx: f64, qy: f64 },
    AreaSink { xc: f64, yc: f64, r: f64, n: f64 },
    Segment { segment: Segment, sigma: f64 },
}

impl Given {
    fn potential(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Well { xw, yw, rw, q } => q * potential::well(x, y, *xw, *yw, *rw),
            Self::Uniform { qx, qy } => -(qx * x + qy * y),
            Self::AreaSink { xc, yc, r, n } => {
                n * potential::circular_area_sink(x, y, *xc, *yc, *r)
            }
            Self::Segment { segment, sigma } => sigma * segment.potential(x, y),
        }
    }
}

/// A contribution whose strength is solved for.
#[derive(Debug, Clone)]
enum Unknown {
    /// Additive constant, fixed by the reference head.
    Constant { xr: f64, yr: f64, hr: f64 },
    /// Head well discharge; controlled at the well screen.
    HeadWell {
        xw: f64,
        yw: f64,
        rw: f64,
        hw: f64,
        res: f64,
    },
    /// Head line sink segment strength; controlled at the segment midpoint.
    Segment {
        segment: Segment,
        hls: f64,
        res: f64,
        wh: f64,
    },
}

impl Unknown {
    /// Potential at `(x, y)` per unit strength.
    fn influence(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Constant { .. } => 1.0,
            Self::HeadWell { xw, yw, rw, .. } => potential::well(x, y, *xw, *yw, *rw),
            Self::Segment { segment, .. } => segment.potential(x, y),
        }
    }

    fn control_point(&self) -> (f64, f64) {
        match self {
            Self::Constant { xr, yr, .. } => (*xr, *yr),
            Self::HeadWell { xw, yw, rw, .. } => (xw + rw, *yw),
            Self::Segment { segment, .. } => segment.midpoint(),
        }
    }

    /// Specified head at the control point.
    fn head(&self) -> f64 {
        match self {
            Self::Constant { hr, .. } => *hr,
            Self::HeadWell { hw, .. } => *hw,
            Self::Segment { hls, .. } => *hls,
        }
    }

    /// Potential jump across the entry resistance per unit strength.
    fn resistance_term(&self, transmissivity: f64, thickness: f64) -> f64 {
        match self {
            Self::Constant { .. } => 0.0,
            Self::HeadWell { rw, res, .. } => {
                transmissivity * res / (2.0 * std::f64::consts::PI * rw * thickness)
            }
            Self::Segment { res, wh, .. } => transmissivity * res / wh,
        }
    }
}

/// In-process solver for one confined aquifer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSolver;

fn check_layer(what: &str, layer: i64) -> SolverResult<()> {
    if layer == 0 {
        Ok(())
    } else {
        Err(SolverError::Unsupported(format!(
            "{} in layer {}: only layer 0 exists",
            what, layer
        )))
    }
}

fn positive(what: &str, value: f64) -> SolverResult<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(SolverError::InvalidInput(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}

impl ReferenceSolver {
    pub fn new() -> Self {
        Self
    }

    /// Solve `elements` on `aquifer`, keeping the concrete model type.
    pub fn build_model(
        &self,
        aquifer: &AquiferStack,
        elements: &[Element],
    ) -> SolverResult<ReferenceModel> {
        if aquifer.naq() != 1 {
            return Err(SolverError::Unsupported(format!(
                "{} aquifers; only a single aquifer is supported",
                aquifer.naq()
            )));
        }
        if let TopBoundary::SemiConfined { .. } = aquifer.top_boundary() {
            return Err(SolverError::Unsupported(
                "semi-confined top boundary".to_string(),
            ));
        }
        let (top, bottom) = aquifer
            .aquifer_bounds(0)
            .ok_or_else(|| SolverError::InvalidInput("aquifer has no bounds".to_string()))?;
        let thickness = positive("aquifer thickness", top - bottom)?;
        let transmissivity = positive("transmissivity", aquifer.kaq()[0] * thickness)?;

        let mut given = Vec::new();
        let mut unknowns = Vec::new();

        for element in elements {
            match element {
                Element::Domain(_) | Element::Aquifer(_) | Element::Observation(_) => {}
                Element::Constant(c) => {
                    check_layer("constant", c.layer)?;
                    unknowns.push(Unknown::Constant {
                        xr: c.xr,
                        yr: c.yr,
                        hr: c.hr,
                    });
                }
                Element::UniformFlow(UniformFlow { slope, angle, .. }) => {
                    let radians = angle.to_radians();
                    given.push(Given::Uniform {
                        qx: transmissivity * slope * radians.cos(),
                        qy: transmissivity * slope * radians.sin(),
                    });
                }
                Element::CircAreaSink(CircAreaSink { xc, yc, r, n, layer, .. }) => {
                    check_layer("circular area sink", *layer)?;
                    given.push(Given::AreaSink {
                        xc: *xc,
                        yc: *yc,
                        r: positive("area sink radius", *r)?,
                        n: *n,
                    });
                }
                Element::Well(Well { xw, yw, qw, rw, layer, .. }) => {
                    check_layer("well", *layer)?;
                    given.push(Given::Well {
                        xw: *xw,
                        yw: *yw,
                        rw: positive("well radius", *rw)?,
                        q: *qw,
                    });
                }
                Element::HeadWell(HeadWell { xw, yw, hw, rw, res, layer, .. }) => {
                    check_layer("head well", *layer)?;
                    unknowns.push(Unknown::HeadWell {
                        xw: *xw,
                        yw: *yw,
                        rw: positive("head well radius", *rw)?,
                        hw: *hw,
                        res: *res,
                    });
                }
                Element::HeadLineSink(HeadLineSink { xy, hls, res, wh, layer, .. }) => {
                    check_layer("head line sink", *layer)?;
                    let wh = if *res > 0.0 { positive("line sink width", *wh)? } else { *wh };
                    for segment in segments(xy) {
                        unknowns.push(Unknown::Segment {
                            segment,
                            hls: *hls,
                            res: *res,
                            wh,
                        });
                    }
                }
                Element::LineSinkDitch(LineSinkDitch { xy, qls, layer, .. }) => {
                    check_layer("line sink ditch", *layer)?;
                    let pieces = segments(xy);
                    let length: f64 = pieces.iter().map(Segment::length).sum();
                    let sigma = qls / positive("ditch length", length)?;
                    given.extend(
                        pieces
                            .into_iter()
                            .map(|segment| Given::Segment { segment, sigma }),
                    );
                }
                Element::LeakyLineDoublet(_) | Element::ImpLineDoublet(_) => {
                    return Err(SolverError::Unsupported(format!(
                        "{} elements",
                        element.kind()
                    )));
                }
            }
        }

        let constants = unknowns
            .iter()
            .filter(|u| matches!(u, Unknown::Constant { .. }))
            .count();
        if constants > 1 {
            return Err(SolverError::InvalidInput(format!(
                "{} reference heads given",
                constants
            )));
        }

        let strengths = solve(&given, &unknowns, transmissivity, thickness)?;
        info!(
            solver = "reference",
            given = given.len(),
            unknowns = unknowns.len(),
            transmissivity,
            "Solved model"
        );

        Ok(ReferenceModel {
            transmissivity,
            given,
            unknowns,
            strengths,
        })
    }
}

impl Solver for ReferenceSolver {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn build(
        &self,
        aquifer: &AquiferStack,
        elements: &[Element],
    ) -> SolverResult<Box<dyn SolvedModel>> {
        Ok(Box::new(self.build_model(aquifer, elements)?))
    }
}

fn solve(
    given: &[Given],
    unknowns: &[Unknown],
    transmissivity: f64,
    thickness: f64,
) -> SolverResult<Vec<f64>> {
    let n = unknowns.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut matrix = DMatrix::zeros(n, n);
    let mut rhs = DVector::zeros(n);

    for (i, row) in unknowns.iter().enumerate() {
        let (x, y) = row.control_point();
        for (j, column) in unknowns.iter().enumerate() {
            matrix[(i, j)] = column.influence(x, y);
        }
        matrix[(i, i)] -= row.resistance_term(transmissivity, thickness);

        let known: f64 = given.iter().map(|g| g.potential(x, y)).sum();
        rhs[i] = transmissivity * row.head() - known;
    }

    debug!(unknowns = n, "Factorising collocation matrix");
    let solution = matrix
        .lu()
        .solve(&rhs)
        .ok_or_else(|| SolverError::Singular(format!("{} x {} collocation matrix", n, n)))?;

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::Singular(
            "solution contains non-finite strengths".to_string(),
        ));
    }
    Ok(solution.iter().copied().collect())
}

/// Solution of a [`ReferenceSolver`] run.
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    transmissivity: f64,
    given: Vec<Given>,
    unknowns: Vec<Unknown>,
    strengths: Vec<f64>,
}

impl ReferenceModel {
    /// Discharge potential at `(x, y)`.
    pub fn potential(&self, x: f64, y: f64) -> f64 {
        let known: f64 = self.given.iter().map(|g| g.potential(x, y)).sum();
        let solved: f64 = self
            .unknowns
            .iter()
            .zip(&self.strengths)
            .map(|(u, s)| s * u.influence(x, y))
            .sum();
        known + solved
    }

    /// Solved strengths: the constant, head well discharges and segment
    /// strengths, in element order.
    pub fn strengths(&self) -> &[f64] {
        &self.strengths
    }
}

impl SolvedModel for ReferenceModel {
    fn naq(&self) -> usize {
        1
    }

    fn head(&self, x: f64, y: f64) -> Vec<f64> {
        vec![self.potential(x, y) / self.transmissivity]
    }
}
