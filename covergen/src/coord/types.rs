//! Coordinate type definitions

use std::fmt;
use std::ops::RangeInclusive;

use geo::{coord, Rect};
use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest zoom level a tile index can address (`2^30` tiles per side fits in `u32`).
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Default zoom range evaluated for every geometry.
pub const DEFAULT_MIN_ZOOM: u8 = 10;
pub const DEFAULT_MAX_ZOOM: u8 = 22;

/// Errors produced by coordinate conversion and zoom range validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -85.05112878 and 85.05112878)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level: {0} (must be at most 30)")]
    InvalidZoom(u8),

    #[error("Invalid zoom range: min {min} is greater than max {max}")]
    InvalidZoomRange { min: u8, max: u8 },
}

/// Tile coordinates in the slippy-map tile pyramid.
///
/// Fields are ordered `z, x, y` so the derived ordering groups tiles by zoom
/// level and then sorts them column-major within a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub z: u8,
    /// Column (east-west), 0 at the antimeridian west edge
    pub x: u32,
    /// Row (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate without range checks.
    #[inline]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one side of the pyramid at `zoom`.
    #[inline]
    pub fn tiles_per_side(zoom: u8) -> u64 {
        1u64 << zoom
    }

    /// Returns true when `x` and `y` both lie in `[0, 2^z)`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        let n = Self::tiles_per_side(self.z);
        self.z <= MAX_SUPPORTED_ZOOM && u64::from(self.x) < n && u64::from(self.y) < n
    }

    /// The tile's extent in normalized world space (the unit square, y down).
    pub fn world_bounds(&self) -> Rect<f64> {
        let n = Self::tiles_per_side(self.z) as f64;
        let (x, y) = (f64::from(self.x), f64::from(self.y));
        Rect::new(
            coord! { x: x / n, y: y / n },
            coord! { x: (x + 1.0) / n, y: (y + 1.0) / n },
        )
    }

    /// The four tiles one zoom level deeper that subdivide this tile.
    pub fn children(&self) -> [TileCoord; 4] {
        let (z, x, y) = (self.z + 1, self.x * 2, self.y * 2);
        [
            TileCoord::new(z, x, y),
            TileCoord::new(z, x + 1, y),
            TileCoord::new(z, x, y + 1),
            TileCoord::new(z, x + 1, y + 1),
        ]
    }

    /// The enclosing tile one zoom level up, or `None` at zoom 0.
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord::new(self.z - 1, self.x / 2, self.y / 2))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A closed range of zoom levels `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    /// Creates a validated zoom range.
    pub fn new(min: u8, max: u8) -> Result<Self, CoordError> {
        if max > MAX_SUPPORTED_ZOOM {
            return Err(CoordError::InvalidZoom(max));
        }
        if min > max {
            return Err(CoordError::InvalidZoomRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// A range containing a single zoom level.
    pub fn single(zoom: u8) -> Result<Self, CoordError> {
        Self::new(zoom, zoom)
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Number of zoom levels in the range.
    pub fn len(&self) -> usize {
        usize::from(self.max - self.min) + 1
    }

    /// Always false; a validated range holds at least one level.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }

    /// Zoom levels in ascending order.
    pub fn iter(&self) -> RangeInclusive<u8> {
        self.min..=self.max
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ZOOM,
            max: DEFAULT_MAX_ZOOM,
        }
    }
}

impl IntoIterator for ZoomRange {
    type Item = u8;
    type IntoIter = RangeInclusive<u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}
