//! Solver-native element definitions.
//!
//! Field names follow the solver's constructor arguments; `kwargs()` gives
//! the exact argument list for script export.

pub use geopackage::Coord;
use serde::Serialize;
use tim_common::BoundingBox;

use crate::aquifer::{AquiferStack, TopBoundary};
use crate::schema::ElementKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub xr: f64,
    pub yr: f64,
    pub hr: f64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformFlow {
    pub slope: f64,
    /// Degrees, counter-clockwise from the positive x axis.
    pub angle: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircAreaSink {
    pub xc: f64,
    pub yc: f64,
    /// Radius.
    pub r: f64,
    /// Infiltration rate (positive raises heads).
    pub n: f64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Well {
    pub xw: f64,
    pub yw: f64,
    pub qw: f64,
    pub rw: f64,
    pub res: f64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadWell {
    pub xw: f64,
    pub yw: f64,
    pub hw: f64,
    pub rw: f64,
    pub res: f64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadLineSink {
    pub xy: Vec<Coord>,
    pub hls: f64,
    pub res: f64,
    pub wh: f64,
    pub order: i64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSinkDitch {
    pub xy: Vec<Coord>,
    pub qls: f64,
    pub res: f64,
    pub wh: f64,
    pub order: i64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakyLineDoublet {
    pub xy: Vec<Coord>,
    pub res: f64,
    pub order: i64,
    pub layer: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpLineDoublet {
    pub xy: Vec<Coord>,
    pub order: i64,
    pub layer: i64,
    pub label: String,
}

/// A point where heads are reported after the solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// One element of a translated model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Element {
    Domain(BoundingBox),
    Aquifer(AquiferStack),
    Constant(Constant),
    UniformFlow(UniformFlow),
    CircAreaSink(CircAreaSink),
    Well(Well),
    HeadWell(HeadWell),
    HeadLineSink(HeadLineSink),
    LineSinkDitch(LineSinkDitch),
    LeakyLineDoublet(LeakyLineDoublet),
    ImpLineDoublet(ImpLineDoublet),
    Observation(Observation),
}

/// A constructor argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Kwarg {
    Float(f64),
    Integer(i64),
    Text(String),
    FloatList(Vec<f64>),
    Coords(Vec<Coord>),
    /// Emitted verbatim (e.g. a variable name).
    Raw(String),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Domain(_) => ElementKind::Domain,
            Self::Aquifer(_) => ElementKind::Aquifer,
            Self::Constant(_) => ElementKind::Constant,
            Self::UniformFlow(_) => ElementKind::UniformFlow,
            Self::CircAreaSink(_) => ElementKind::CircAreaSink,
            Self::Well(_) => ElementKind::Well,
            Self::HeadWell(_) => ElementKind::HeadWell,
            Self::HeadLineSink(_) => ElementKind::HeadLineSink,
            Self::LineSinkDitch(_) => ElementKind::LineSinkDitch,
            Self::LeakyLineDoublet(_) => ElementKind::LeakyLineDoublet,
            Self::ImpLineDoublet(_) => ElementKind::ImpLineDoublet,
            Self::Observation(_) => ElementKind::Observation,
        }
    }

    /// Solver class constructed for this element; `None` for the domain and
    /// observations, which the solver never sees.
    pub fn solver_class(&self) -> Option<&'static str> {
        let class = match self {
            Self::Domain(_) | Self::Observation(_) => return None,
            Self::Aquifer(_) => "ModelMaq",
            Self::Constant(_) => "Constant",
            Self::UniformFlow(_) => "Uflow",
            Self::CircAreaSink(_) => "CircAreaSink",
            Self::Well(_) => "Well",
            Self::HeadWell(_) => "HeadWell",
            Self::HeadLineSink(_) => "HeadLineSinkString",
            Self::LineSinkDitch(_) => "LineSinkDitchString",
            Self::LeakyLineDoublet(_) => "LeakyLineDoubletString",
            Self::ImpLineDoublet(_) => "ImpLineDoubletString",
        };
        Some(class)
    }

    /// Constructor arguments in declaration order.
    pub fn kwargs(&self) -> Vec<(&'static str, Kwarg)> {
        use Kwarg::{Coords, Float, Integer, Text};

        match self {
            Self::Domain(_) => Vec::new(),
            Self::Observation(e) => vec![("x", Float(e.x)), ("y", Float(e.y))],
            Self::Aquifer(stack) => {
                let (topboundary, hstar) = match stack.top_boundary() {
                    TopBoundary::Confined => ("conf", Kwarg::Raw("None".to_string())),
                    TopBoundary::SemiConfined { hstar } => ("semi", Float(hstar)),
                };
                vec![
                    ("kaq", Kwarg::FloatList(stack.kaq().to_vec())),
                    ("z", Kwarg::FloatList(stack.z().to_vec())),
                    ("c", Kwarg::FloatList(stack.c().to_vec())),
                    ("npor", Kwarg::FloatList(stack.npor().to_vec())),
                    ("topboundary", Text(topboundary.to_string())),
                    ("hstar", hstar),
                ]
            }
            Self::Constant(e) => vec![
                ("xr", Float(e.xr)),
                ("yr", Float(e.yr)),
                ("hr", Float(e.hr)),
                ("layer", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
            Self::UniformFlow(e) => vec![
                ("slope", Float(e.slope)),
                ("angle", Float(e.angle)),
                ("label", Text(e.label.clone())),
            ],
            Self::CircAreaSink(e) => vec![
                ("xc", Float(e.xc)),
                ("yc", Float(e.yc)),
                ("R", Float(e.r)),
                ("N", Float(e.n)),
                ("label", Text(e.label.clone())),
            ],
            Self::Well(e) => vec![
                ("xw", Float(e.xw)),
                ("yw", Float(e.yw)),
                ("Qw", Float(e.qw)),
                ("rw", Float(e.rw)),
                ("res", Float(e.res)),
                ("layers", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
            Self::HeadWell(e) => vec![
                ("xw", Float(e.xw)),
                ("yw", Float(e.yw)),
                ("hw", Float(e.hw)),
                ("rw", Float(e.rw)),
                ("res", Float(e.res)),
                ("layers", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
            Self::HeadLineSink(e) => vec![
                ("xy", Coords(e.xy.clone())),
                ("hls", Float(e.hls)),
                ("res", Float(e.res)),
                ("wh", Float(e.wh)),
                ("order", Integer(e.order)),
                ("layers", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
            Self::LineSinkDitch(e) => vec![
                ("xy", Coords(e.xy.clone())),
                ("Qls", Float(e.qls)),
                ("res", Float(e.res)),
                ("wh", Float(e.wh)),
                ("order", Integer(e.order)),
                ("layers", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
            Self::LeakyLineDoublet(e) => vec![
                ("xy", Coords(e.xy.clone())),
                ("res", Float(e.res)),
                ("order", Integer(e.order)),
                ("layers", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
            Self::ImpLineDoublet(e) => vec![
                ("xy", Coords(e.xy.clone())),
                ("order", Integer(e.order)),
                ("layers", Integer(e.layer)),
                ("label", Text(e.label.clone())),
            ],
        }
    }
}
