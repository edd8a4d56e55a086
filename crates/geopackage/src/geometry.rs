//! GeoPackage geometry blob and WKB decoding.
//!
//! A GeoPackage geometry column stores a small binary header followed by a
//! standard Well-Known Binary body:
//!
//! ```text
//! "GP" | version u8 | flags u8 | srs_id i32 | envelope f64[0|4|6|8] | WKB
//! ```
//!
//! Flag bit 0 selects the byte order of the header, bits 1-3 the envelope
//! layout and bit 4 marks an empty geometry. The WKB body carries its own
//! byte order per (sub-)geometry. Z and M ordinates are read and dropped,
//! whether they are signalled ISO style (type + 1000/2000/3000) or with the
//! EWKB high bits.

use nom::bytes::complete::{tag, take};
use nom::multi::count;
use nom::number::complete::{f64 as float64, i32 as int32, u32 as uint32, u8 as uint8};
use nom::number::Endianness;
use nom::IResult;
use serde::{Deserialize, Serialize};
use tim_common::BoundingBox;

use crate::error::{GeoPackageError, GeoPackageResult};

type ParseResult<'a, T> = IResult<&'a [u8], T>;
type ParseError<'a> = nom::error::Error<&'a [u8]>;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// A planar coordinate. Extra ordinates are not retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Simple-feature geometry type, as named in `gpkg_geometry_columns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    /// Anything else (`GEOMETRY`, `GEOMETRYCOLLECTION`, curves ...).
    Other,
}

impl GeometryType {
    /// Parse a `geometry_type_name` value. Case-insensitive.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "POINT" => Self::Point,
            "LINESTRING" => Self::LineString,
            "POLYGON" => Self::Polygon,
            "MULTIPOINT" => Self::MultiPoint,
            "MULTILINESTRING" => Self::MultiLineString,
            "MULTIPOLYGON" => Self::MultiPolygon,
            _ => Self::Other,
        }
    }

    fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Point),
            2 => Some(Self::LineString),
            3 => Some(Self::Polygon),
            4 => Some(Self::MultiPoint),
            5 => Some(Self::MultiLineString),
            6 => Some(Self::MultiPolygon),
            _ => None,
        }
    }

    /// The single-part type a multi type is made of.
    pub fn single_part(self) -> Self {
        match self {
            Self::MultiPoint => Self::Point,
            Self::MultiLineString => Self::LineString,
            Self::MultiPolygon => Self::Polygon,
            other => other,
        }
    }
}

/// Decoded feature geometry. Vertex order is exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Rings, exterior first.
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::Polygon(_) => GeometryType::Polygon,
            Self::MultiPoint(_) => GeometryType::MultiPoint,
            Self::MultiLineString(_) => GeometryType::MultiLineString,
            Self::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    /// Number of parts: 1 for single geometries.
    pub fn part_count(&self) -> usize {
        match self {
            Self::MultiPoint(parts) => parts.len(),
            Self::MultiLineString(parts) => parts.len(),
            Self::MultiPolygon(parts) => parts.len(),
            _ => 1,
        }
    }

    /// Collapse a one-part multi geometry into its part.
    ///
    /// Returns `None` for multi geometries with zero or several parts.
    pub fn into_single_part(self) -> Option<Self> {
        match self {
            Self::MultiPoint(mut parts) if parts.len() == 1 => parts.pop().map(Self::Point),
            Self::MultiLineString(mut parts) if parts.len() == 1 => {
                parts.pop().map(Self::LineString)
            }
            Self::MultiPolygon(mut parts) if parts.len() == 1 => parts.pop().map(Self::Polygon),
            Self::MultiPoint(_) | Self::MultiLineString(_) | Self::MultiPolygon(_) => None,
            single => Some(single),
        }
    }

    /// All vertices, flattened in storage order.
    pub fn vertices(&self) -> Vec<Coord> {
        match self {
            Self::Point(c) => vec![*c],
            Self::LineString(line) | Self::MultiPoint(line) => line.clone(),
            Self::Polygon(rings) | Self::MultiLineString(rings) => {
                rings.iter().flatten().copied().collect()
            }
            Self::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().collect(),
        }
    }

    /// Bounding box of all vertices.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices().into_iter().map(|c| (c.x, c.y)))
    }
}

/// A decoded GeoPackage geometry value.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBlob {
    /// SRS id written in the blob header.
    pub srs_id: i32,
    /// `None` when the blob is flagged empty or is an empty point.
    pub geometry: Option<Geometry>,
}

/// Decode a GeoPackage geometry blob (`GP` header + WKB).
pub fn decode_gpkg_blob(blob: &[u8]) -> GeoPackageResult<GeometryBlob> {
    let (wkb, (srs_id, empty)) = gpkg_header(blob).map_err(|e| invalid("GeoPackage header", e))?;
    if empty {
        return Ok(GeometryBlob {
            srs_id,
            geometry: None,
        });
    }
    let geometry = decode_wkb(wkb)?;
    Ok(GeometryBlob { srs_id, geometry })
}

/// Decode a bare WKB or EWKB geometry.
///
/// An empty point (NaN coordinates) decodes to `None`.
pub fn decode_wkb(wkb: &[u8]) -> GeoPackageResult<Option<Geometry>> {
    let (_, geometry) = wkb_geometry(wkb).map_err(|e| invalid("WKB", e))?;
    match geometry {
        Geometry::Point(c) if c.x.is_nan() && c.y.is_nan() => Ok(None),
        other => Ok(Some(other)),
    }
}

fn invalid(what: &str, err: nom::Err<nom::error::Error<&[u8]>>) -> GeoPackageError {
    let reason = match err {
        nom::Err::Incomplete(_) => "truncated".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("{:?} with {} bytes left", e.code, e.input.len())
        }
    };
    GeoPackageError::InvalidGeometry(format!("{}: {}", what, reason))
}

fn failure<T>(input: &[u8], kind: nom::error::ErrorKind) -> ParseResult<'_, T> {
    Err(nom::Err::Failure(nom::error::Error::new(input, kind)))
}

fn read_u8(input: &[u8]) -> ParseResult<'_, u8> {
    uint8(input)
}

fn read_u32(endian: Endianness) -> impl Fn(&[u8]) -> ParseResult<'_, u32> {
    move |input| uint32(endian)(input)
}

fn read_i32(endian: Endianness) -> impl Fn(&[u8]) -> ParseResult<'_, i32> {
    move |input| int32(endian)(input)
}

fn read_f64(endian: Endianness) -> impl Fn(&[u8]) -> ParseResult<'_, f64> {
    move |input| float64(endian)(input)
}

fn gpkg_header(input: &[u8]) -> ParseResult<'_, (i32, bool)> {
    let (input, _) = tag::<_, _, ParseError>(b"GP".as_slice())(input)?;
    let (input, _version) = read_u8(input)?;
    let (input, flags) = read_u8(input)?;

    let endian = if flags & 0x01 == 1 {
        Endianness::Little
    } else {
        Endianness::Big
    };
    let envelope_doubles = match (flags >> 1) & 0x07 {
        0 => 0,
        1 => 4,
        2 | 3 => 6,
        4 => 8,
        _ => return failure(input, nom::error::ErrorKind::Verify),
    };
    let empty = flags & 0x10 != 0;

    let (input, srs_id) = read_i32(endian)(input)?;
    let (input, _envelope) = take::<_, _, ParseError>(envelope_doubles * 8usize)(input)?;
    Ok((input, (srs_id, empty)))
}

fn byte_order(input: &[u8]) -> ParseResult<'_, Endianness> {
    let (rest, marker) = read_u8(input)?;
    match marker {
        0 => Ok((rest, Endianness::Big)),
        1 => Ok((rest, Endianness::Little)),
        _ => failure(input, nom::error::ErrorKind::Verify),
    }
}

struct WkbHeader {
    endian: Endianness,
    geometry_type: GeometryType,
    dims: usize,
}

fn wkb_header(input: &[u8]) -> ParseResult<'_, WkbHeader> {
    let start = input;
    let (input, endian) = byte_order(input)?;
    let (mut input, raw) = read_u32(endian)(input)?;

    let mut dims = 2;
    if raw & EWKB_Z != 0 {
        dims += 1;
    }
    if raw & EWKB_M != 0 {
        dims += 1;
    }
    if raw & EWKB_SRID != 0 {
        let (rest, _srid) = read_u32(endian)(input)?;
        input = rest;
    }

    let code = raw & 0x0FFF_FFFF;
    dims += match code / 1000 {
        0 => 0,
        1 | 2 => 1,
        3 => 2,
        _ => return failure(start, nom::error::ErrorKind::Verify),
    };
    let geometry_type = match GeometryType::from_wkb_code(code % 1000) {
        Some(t) => t,
        None => return failure(start, nom::error::ErrorKind::Switch),
    };

    Ok((
        input,
        WkbHeader {
            endian,
            geometry_type,
            dims,
        },
    ))
}

fn coord(endian: Endianness, dims: usize) -> impl Fn(&[u8]) -> ParseResult<'_, Coord> {
    move |input| {
        let (input, ordinates) = count(read_f64(endian), dims)(input)?;
        Ok((input, Coord::new(ordinates[0], ordinates[1])))
    }
}

fn coord_seq(endian: Endianness, dims: usize) -> impl Fn(&[u8]) -> ParseResult<'_, Vec<Coord>> {
    move |input| {
        let (input, n) = read_u32(endian)(input)?;
        count(coord(endian, dims), n as usize)(input)
    }
}

fn rings(endian: Endianness, dims: usize) -> impl Fn(&[u8]) -> ParseResult<'_, Vec<Vec<Coord>>> {
    move |input| {
        let (input, n) = read_u32(endian)(input)?;
        count(coord_seq(endian, dims), n as usize)(input)
    }
}

/// Parse one sub-geometry of a multi geometry, which must be of `expected` type.
fn part(expected: GeometryType) -> impl Fn(&[u8]) -> ParseResult<'_, Geometry> {
    move |input| {
        let (rest, geometry) = wkb_geometry(input)?;
        if geometry.geometry_type() != expected {
            return failure(input, nom::error::ErrorKind::Verify);
        }
        Ok((rest, geometry))
    }
}

fn wkb_geometry(input: &[u8]) -> ParseResult<'_, Geometry> {
    let (input, header) = wkb_header(input)?;
    let WkbHeader {
        endian,
        geometry_type,
        dims,
    } = header;

    match geometry_type {
        GeometryType::Point => {
            let (input, c) = coord(endian, dims)(input)?;
            Ok((input, Geometry::Point(c)))
        }
        GeometryType::LineString => {
            let (input, line) = coord_seq(endian, dims)(input)?;
            Ok((input, Geometry::LineString(line)))
        }
        GeometryType::Polygon => {
            let (input, rs) = rings(endian, dims)(input)?;
            Ok((input, Geometry::Polygon(rs)))
        }
        GeometryType::MultiPoint
        | GeometryType::MultiLineString
        | GeometryType::MultiPolygon => {
            let (input, n) = read_u32(endian)(input)?;
            let (input, parts) = count(part(geometry_type.single_part()), n as usize)(input)?;
            let geometry = match geometry_type {
                GeometryType::MultiPoint => Geometry::MultiPoint(
                    parts
                        .into_iter()
                        .filter_map(|g| match g {
                            Geometry::Point(c) => Some(c),
                            _ => None,
                        })
                        .collect(),
                ),
                GeometryType::MultiLineString => Geometry::MultiLineString(
                    parts
                        .into_iter()
                        .filter_map(|g| match g {
                            Geometry::LineString(l) => Some(l),
                            _ => None,
                        })
                        .collect(),
                ),
                _ => Geometry::MultiPolygon(
                    parts
                        .into_iter()
                        .filter_map(|g| match g {
                            Geometry::Polygon(p) => Some(p),
                            _ => None,
                        })
                        .collect(),
                ),
            };
            Ok((input, geometry))
        }
        GeometryType::Other => failure(input, nom::error::ErrorKind::Switch),
    }
}
