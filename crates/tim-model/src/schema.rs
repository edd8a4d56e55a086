//! Static schema registry: which attributes and geometry each element kind carries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::value::Value;

/// Every element kind the registry knows about.
///
/// The declaration order is the order in which elements are translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Domain,
    Aquifer,
    Constant,
    UniformFlow,
    CircAreaSink,
    Well,
    HeadWell,
    HeadLineSink,
    LineSinkDitch,
    LeakyLineDoublet,
    ImpLineDoublet,
    PolygonInhom,
    /// Head sampling point; never part of the solve.
    Observation,
}

impl ElementKind {
    pub const ALL: [ElementKind; 13] = [
        Self::Domain,
        Self::Aquifer,
        Self::Constant,
        Self::UniformFlow,
        Self::CircAreaSink,
        Self::Well,
        Self::HeadWell,
        Self::HeadLineSink,
        Self::LineSinkDitch,
        Self::LeakyLineDoublet,
        Self::ImpLineDoublet,
        Self::PolygonInhom,
        Self::Observation,
    ];

    /// Name used in layer names, e.g. `HeadWell` in `timmlHeadWell:north`.
    pub fn layer_name(&self) -> &'static str {
        match self {
            Self::Domain => "Domain",
            Self::Aquifer => "Aquifer",
            Self::Constant => "Constant",
            Self::UniformFlow => "UniformFlow",
            Self::CircAreaSink => "CircAreaSink",
            Self::Well => "Well",
            Self::HeadWell => "HeadWell",
            Self::HeadLineSink => "HeadLineSink",
            Self::LineSinkDitch => "LineSinkDitch",
            Self::LeakyLineDoublet => "LeakyLineDoublet",
            Self::ImpLineDoublet => "ImpLineDoublet",
            Self::PolygonInhom => "PolygonInhom",
            Self::Observation => "Observation",
        }
    }

    /// Snake-case name used in messages and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Aquifer => "aquifer",
            Self::Constant => "constant",
            Self::UniformFlow => "uniform_flow",
            Self::CircAreaSink => "circ_area_sink",
            Self::Well => "well",
            Self::HeadWell => "head_well",
            Self::HeadLineSink => "head_line_sink",
            Self::LineSinkDitch => "line_sink_ditch",
            Self::LeakyLineDoublet => "leaky_line_doublet",
            Self::ImpLineDoublet => "imp_line_doublet",
            Self::PolygonInhom => "polygon_inhom",
            Self::Observation => "observation",
        }
    }

    /// Resolve a kind name. Case, spaces and underscores are ignored, and the
    /// long spellings a GIS front-end writes ("Head Well", "Uniform Flow",
    /// "Polygon Inhomogeneity") are accepted.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let kind = match normalized.as_str() {
            "domain" => Self::Domain,
            "aquifer" => Self::Aquifer,
            "constant" => Self::Constant,
            "uniformflow" | "uflow" => Self::UniformFlow,
            "circareasink" | "circularareasink" => Self::CircAreaSink,
            "well" => Self::Well,
            "headwell" => Self::HeadWell,
            "headlinesink" => Self::HeadLineSink,
            "linesinkditch" => Self::LineSinkDitch,
            "leakylinedoublet" => Self::LeakyLineDoublet,
            "implinedoublet" | "impermeablelinedoublet" => Self::ImpLineDoublet,
            "polygoninhom" | "polygoninhomogeneity" => Self::PolygonInhom,
            "observation" | "headobservation" => Self::Observation,
            _ => {
                return Err(ModelError::UnknownKind {
                    layer: String::new(),
                    kind: name.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared scalar type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Float,
    Integer,
    Text,
    Boolean,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Geometry a layer of a given kind must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    /// Attribute-only table.
    None,
}

/// A default that can live in a static table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Float(f64),
    Integer(i64),
    Text(&'static str),
    Boolean(bool),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Float(v) => Value::Float(v),
            Self::Integer(v) => Value::Integer(v),
            Self::Text(v) => Value::Text(v.to_string()),
            Self::Boolean(v) => Value::Boolean(v),
        }
    }
}

/// Whether an attribute must be present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence {
    Required,
    /// Absent values take this default.
    Default(DefaultValue),
    /// Absent values stay `Null`.
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub ty: ScalarType,
    pub presence: Presence,
}

impl AttributeDecl {
    /// The value an absent attribute takes, or `None` when it is required.
    pub fn missing_value(&self) -> Option<Value> {
        match self.presence {
            Presence::Required => None,
            Presence::Default(d) => Some(d.to_value()),
            Presence::Optional => Some(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemaEntry {
    pub kind: ElementKind,
    pub geometry: GeometryKind,
    pub attributes: &'static [AttributeDecl],
}

impl SchemaEntry {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

const fn required(name: &'static str, ty: ScalarType) -> AttributeDecl {
    AttributeDecl {
        name,
        ty,
        presence: Presence::Required,
    }
}

const fn optional(name: &'static str, ty: ScalarType) -> AttributeDecl {
    AttributeDecl {
        name,
        ty,
        presence: Presence::Optional,
    }
}

const fn with_default(name: &'static str, ty: ScalarType, default: DefaultValue) -> AttributeDecl {
    AttributeDecl {
        name,
        ty,
        presence: Presence::Default(default),
    }
}

use DefaultValue as D;
use ScalarType::{Boolean, Float, Integer, Text};

const LAYER: AttributeDecl = with_default("layer", Integer, D::Integer(0));
const LABEL: AttributeDecl = with_default("label", Text, D::Text(""));
const ORDER: AttributeDecl = with_default("order", Integer, D::Integer(0));
const RADIUS: AttributeDecl = with_default("radius", Float, D::Float(0.1));
const RESISTANCE: AttributeDecl = with_default("resistance", Float, D::Float(0.0));
const WIDTH: AttributeDecl = with_default("width", Float, D::Float(1.0));

static AQUIFER: SchemaEntry = SchemaEntry {
    kind: ElementKind::Aquifer,
    geometry: GeometryKind::None,
    attributes: &[
        optional("conductivity", Float),
        optional("resistance", Float),
        required("top", Float),
        required("bottom", Float),
        with_default("porosity", Float, D::Float(0.3)),
        optional("headtop", Float),
    ],
};

static DOMAIN: SchemaEntry = SchemaEntry {
    kind: ElementKind::Domain,
    geometry: GeometryKind::Polygon,
    attributes: &[],
};

static CONSTANT: SchemaEntry = SchemaEntry {
    kind: ElementKind::Constant,
    geometry: GeometryKind::Point,
    attributes: &[required("head", Float), LAYER, LABEL],
};

static UNIFORM_FLOW: SchemaEntry = SchemaEntry {
    kind: ElementKind::UniformFlow,
    geometry: GeometryKind::None,
    attributes: &[required("slope", Float), required("angle", Float), LABEL],
};

static CIRC_AREA_SINK: SchemaEntry = SchemaEntry {
    kind: ElementKind::CircAreaSink,
    geometry: GeometryKind::Polygon,
    attributes: &[required("rate", Float), LAYER, LABEL],
};

static WELL: SchemaEntry = SchemaEntry {
    kind: ElementKind::Well,
    geometry: GeometryKind::Point,
    attributes: &[
        required("discharge", Float),
        RADIUS,
        RESISTANCE,
        LAYER,
        LABEL,
    ],
};

static HEAD_WELL: SchemaEntry = SchemaEntry {
    kind: ElementKind::HeadWell,
    geometry: GeometryKind::Point,
    attributes: &[required("head", Float), RADIUS, RESISTANCE, LAYER, LABEL],
};

static HEAD_LINE_SINK: SchemaEntry = SchemaEntry {
    kind: ElementKind::HeadLineSink,
    geometry: GeometryKind::Line,
    attributes: &[
        required("head", Float),
        RESISTANCE,
        WIDTH,
        ORDER,
        LAYER,
        LABEL,
    ],
};

static LINE_SINK_DITCH: SchemaEntry = SchemaEntry {
    kind: ElementKind::LineSinkDitch,
    geometry: GeometryKind::Line,
    attributes: &[
        required("discharge", Float),
        RESISTANCE,
        WIDTH,
        ORDER,
        LAYER,
        LABEL,
    ],
};

static LEAKY_LINE_DOUBLET: SchemaEntry = SchemaEntry {
    kind: ElementKind::LeakyLineDoublet,
    geometry: GeometryKind::Line,
    attributes: &[required("resistance", Float), ORDER, LAYER, LABEL],
};

static IMP_LINE_DOUBLET: SchemaEntry = SchemaEntry {
    kind: ElementKind::ImpLineDoublet,
    geometry: GeometryKind::Line,
    attributes: &[ORDER, LAYER, LABEL],
};

static POLYGON_INHOM: SchemaEntry = SchemaEntry {
    kind: ElementKind::PolygonInhom,
    geometry: GeometryKind::Polygon,
    attributes: &[
        optional("conductivity", Float),
        optional("resistance", Float),
        required("top", Float),
        required("bottom", Float),
        with_default("topconfined", Boolean, D::Boolean(false)),
        optional("tophead", Float),
        with_default("order", Integer, D::Integer(3)),
        with_default("ndegrees", Integer, D::Integer(6)),
    ],
};

static OBSERVATION: SchemaEntry = SchemaEntry {
    kind: ElementKind::Observation,
    geometry: GeometryKind::Point,
    attributes: &[LABEL],
};

/// Schema for a kind. Total over `ElementKind`.
pub fn schema_for(kind: ElementKind) -> &'static SchemaEntry {
    match kind {
        ElementKind::Aquifer => &AQUIFER,
        ElementKind::Domain => &DOMAIN,
        ElementKind::Constant => &CONSTANT,
        ElementKind::UniformFlow => &UNIFORM_FLOW,
        ElementKind::CircAreaSink => &CIRC_AREA_SINK,
        ElementKind::Well => &WELL,
        ElementKind::HeadWell => &HEAD_WELL,
        ElementKind::HeadLineSink => &HEAD_LINE_SINK,
        ElementKind::LineSinkDitch => &LINE_SINK_DITCH,
        ElementKind::LeakyLineDoublet => &LEAKY_LINE_DOUBLET,
        ElementKind::ImpLineDoublet => &IMP_LINE_DOUBLET,
        ElementKind::PolygonInhom => &POLYGON_INHOM,
        ElementKind::Observation => &OBSERVATION,
    }
}

/// Schema for a kind name; unknown names fail with `UnknownKind`.
pub fn schema_for_name(name: &str) -> Result<&'static SchemaEntry> {
    ElementKind::from_name(name).map(schema_for)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_has_matching_entry() {
        for kind in ElementKind::ALL {
            assert_eq!(schema_for(kind).kind, kind);
        }
    }

    #[test]
    fn test_attribute_names_unique() {
        for kind in ElementKind::ALL {
            let names: HashSet<_> = schema_for(kind).attributes.iter().map(|a| a.name).collect();
            assert_eq!(names.len(), schema_for(kind).attributes.len(), "{}", kind);
        }
    }

    #[test]
    fn test_from_name_variants() {
        assert_eq!(ElementKind::from_name("Well").unwrap(), ElementKind::Well);
        assert_eq!(ElementKind::from_name("head well").unwrap(), ElementKind::HeadWell);
        assert_eq!(
            ElementKind::from_name("Impermeable Line Doublet").unwrap(),
            ElementKind::ImpLineDoublet
        );
        assert_eq!(ElementKind::from_name("UFLOW").unwrap(), ElementKind::UniformFlow);
    }

    #[test]
    fn test_from_name_roundtrips_layer_name() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_name(kind.layer_name()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = schema_for_name("Borehole").unwrap_err();
        assert!(matches!(err, ModelError::UnknownKind { kind, .. } if kind == "Borehole"));
    }

    #[test]
    fn test_well_defaults() {
        let well = schema_for(ElementKind::Well);
        assert_eq!(well.geometry, GeometryKind::Point);
        assert_eq!(well.attribute("discharge").unwrap().missing_value(), None);
        assert_eq!(
            well.attribute("radius").unwrap().missing_value(),
            Some(Value::Float(0.1))
        );
        assert_eq!(
            well.attribute("label").unwrap().missing_value(),
            Some(Value::Text(String::new()))
        );
    }

    #[test]
    fn test_observation_schema() {
        let observation = schema_for_name("Head Observation").unwrap();
        assert_eq!(observation.kind, ElementKind::Observation);
        assert_eq!(observation.geometry, GeometryKind::Point);
        assert!(observation.attribute("layer").is_none());
        assert_eq!(
            observation.attribute("label").unwrap().missing_value(),
            Some(Value::Text(String::new()))
        );
    }

    #[test]
    fn test_aquifer_optional_attributes() {
        let aquifer = schema_for(ElementKind::Aquifer);
        assert_eq!(aquifer.geometry, GeometryKind::None);
        assert_eq!(
            aquifer.attribute("headtop").unwrap().missing_value(),
            Some(Value::Null)
        );
    }
}
