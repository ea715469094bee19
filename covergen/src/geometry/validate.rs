//! Geometry validation performed before tile coverage.

use geo::{CoordsIter, Geometry, Polygon};
use thiserror::Error;

/// A geometry that cannot be covered at a given zoom level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A polygon has interior rings but no exterior ring.
    #[error("polygon {polygon} has {holes} interior ring(s) but an empty exterior ring")]
    EmptyExterior { polygon: usize, holes: usize },

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },
}

/// Checks that a geometry can be projected and covered.
///
/// Empty geometries are valid (they simply cover no tiles).
pub fn validate(geometry: &Geometry<f64>) -> Result<(), GeometryError> {
    if let Some(c) = geometry
        .coords_iter()
        .find(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(GeometryError::NonFiniteCoordinate { x: c.x, y: c.y });
    }

    match geometry {
        Geometry::Polygon(polygon) => check_rings(0, polygon),
        Geometry::MultiPolygon(multi) => multi
            .0
            .iter()
            .enumerate()
            .try_for_each(|(index, polygon)| check_rings(index, polygon)),
        _ => Ok(()),
    }
}

fn check_rings(index: usize, polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    if polygon.exterior().0.is_empty() && !polygon.interiors().is_empty() {
        return Err(GeometryError::EmptyExterior {
            polygon: index,
            holes: polygon.interiors().len(),
        });
    }
    Ok(())
}
