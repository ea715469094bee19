//! Source geometries and their decoding.
//!
//! A [`Feature`] pairs a source row id with a decoded `geo::Geometry`. Rows
//! arrive as OGC Well-Known Binary and are decoded with `geozero`; only
//! polygonal geometries (and the degenerate `Point` case) are accepted.

mod validate;

pub use validate::{validate, GeometryError};

use geo::{Geometry, MapCoords};
use geozero::error::GeozeroError;
use geozero::wkb::Wkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};
use thiserror::Error;

use crate::coord::to_world;

/// Errors that can occur while decoding a source row's geometry payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The payload is not valid WKB.
    #[error("malformed WKB payload: {0}")]
    Malformed(String),

    /// The geometry column holds text or a number instead of bytes.
    #[error("geometry column holds {0}, expected a WKB blob")]
    NotBinary(&'static str),

    /// The payload decoded to a geometry type the index does not cover.
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(&'static str),
}

/// A decoded source geometry with its identifier.
///
/// Coordinates are geographic: `x` is longitude and `y` is latitude, in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: i64,
    pub geometry: Geometry<f64>,
}

impl Feature {
    pub fn new(id: i64, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id,
            geometry: geometry.into(),
        }
    }

    /// Decodes a WKB payload into a feature.
    pub fn from_wkb(id: i64, payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            id,
            geometry: decode_wkb(payload)?,
        })
    }
}

/// Decodes WKB bytes into a polygonal (or point) geometry.
pub fn decode_wkb(payload: &[u8]) -> Result<Geometry<f64>, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Malformed("empty payload".to_string()));
    }

    let geometry = Wkb(payload.to_vec())
        .to_geo()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Point(_) => Ok(geometry),
        other => Err(DecodeError::UnsupportedType(type_name(&other))),
    }
}

/// Encodes a geometry as 2D WKB.
pub fn encode_wkb(geometry: &Geometry<f64>) -> Result<Vec<u8>, GeozeroError> {
    geometry.to_wkb(CoordDimensions::xy())
}

/// Human-readable name of a geometry variant, used in logs and errors.
pub fn type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Projects a geographic geometry into normalized Web Mercator world space.
pub fn project_to_world(geometry: &Geometry<f64>) -> Geometry<f64> {
    geometry.map_coords(to_world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    fn to_wkb(geometry: &Geometry<f64>) -> Vec<u8> {
        encode_wkb(geometry).unwrap()
    }

    #[test]
    fn test_decode_polygon() {
        let square: Geometry<f64> = polygon![
            (x: 10.0, y: 10.0),
            (x: 11.0, y: 10.0),
            (x: 11.0, y: 11.0),
            (x: 10.0, y: 11.0),
        ]
        .into();

        let feature = Feature::from_wkb(7, &to_wkb(&square)).unwrap();
        assert_eq!(feature.id, 7);
        assert!(matches!(feature.geometry, Geometry::Polygon(_)));
    }

    #[test]
    fn test_decode_point() {
        let point: Geometry<f64> = Point::new(13.4, 52.5).into();
        let decoded = decode_wkb(&to_wkb(&point)).unwrap();
        assert_eq!(decoded, point);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_wkb(&[0x01, 0x03, 0xff]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(matches!(decode_wkb(&[]), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_linestring() {
        use geo::line_string;
        let line: Geometry<f64> =
            geo::line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        let result = decode_wkb(&to_wkb(&line));
        assert_eq!(result, Err(DecodeError::UnsupportedType("LineString")));
    }

    #[test]
    fn test_project_to_world_maps_origin_to_center() {
        let projected = project_to_world(&Point::new(0.0, 0.0).into());
        match projected {
            Geometry::Point(p) => {
                assert!((p.x() - 0.5).abs() < 1e-12);
                assert!((p.y() - 0.5).abs() < 1e-12);
            }
            other => panic!("expected point, got {}", type_name(&other)),
        }
    }
}
