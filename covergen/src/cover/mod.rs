//! Tile coverage engine.
//!
//! Computes the set of tiles a geometry occupies at one zoom level. Two
//! interchangeable strategies are provided:
//!
//! - [`Strategy::Exact`] descends the tile quadtree in world space, pruning
//!   tiles whose interior does not meet the geometry and short-circuiting
//!   tiles the geometry fully contains.
//! - [`Strategy::Bbox`] enumerates the rectangular tile range spanned by the
//!   geometry's bounding box.
//!
//! Both strategies share one projection and one boundary rule: a tile is
//! covered when the geometry reaches into the tile's interior, so a polygon
//! that merely touches a tile edge does not claim the neighbouring tile.
//! The exact result is always a subset of the bbox result.
//!
//! ```text
//!   bbox:  ┌───┬───┬───┐      exact:  ┌───┬───┬───┐
//!          │ * │ * │ * │              │   │ * │   │
//!          ├───┼───┼───┤              ├───┼───┼───┤
//!          │ * │ * │ * │              │ * │ * │ * │
//!          └───┴───┴───┘              └───┴───┴───┘
//! ```
//!
//! The engine is stateless: results depend only on the geometry and zoom.

mod bbox;
mod exact;

pub use bbox::{bbox_range, TileRange};

use std::fmt;
use std::str::FromStr;

use geo::Geometry;
use thiserror::Error;

use crate::coord::{TileCoord, MAX_SUPPORTED_ZOOM};
use crate::geometry::{validate, GeometryError};

/// Tile coverage strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Geometry-aware covering via quadtree descent.
    #[default]
    Exact,
    /// Bounding-rectangle enumeration (superset of `Exact`).
    Bbox,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Exact => "exact",
            Strategy::Bbox => "bbox",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(Strategy::Exact),
            "bbox" => Ok(Strategy::Bbox),
            other => Err(format!("unknown strategy '{}', expected exact or bbox", other)),
        }
    }
}

/// Errors for a single (geometry, zoom) coverage computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverError {
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("zoom level {0} exceeds the maximum of 30")]
    UnsupportedZoom(u8),
}

/// Computes the tiles `geometry` covers at `zoom`.
///
/// Tiles are returned sorted and without duplicates. An empty geometry
/// covers nothing and is not an error.
pub fn cover(
    geometry: &Geometry<f64>,
    zoom: u8,
    strategy: Strategy,
) -> Result<Vec<TileCoord>, CoverError> {
    if zoom > MAX_SUPPORTED_ZOOM {
        return Err(CoverError::UnsupportedZoom(zoom));
    }
    validate(geometry)?;

    let Some(range) = bbox_range(geometry, zoom) else {
        return Ok(Vec::new());
    };

    let tiles = match strategy {
        Strategy::Bbox => range.iter().collect(),
        Strategy::Exact => exact::cover_exact(geometry, range),
    };

    debug_assert!(tiles.iter().all(TileCoord::is_valid));
    Ok(tiles)
}
