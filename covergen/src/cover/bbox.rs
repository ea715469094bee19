//! Bounding-box tile enumeration.

use geo::{coord, BoundingRect, Geometry, Rect};

use crate::coord::{clamp_index, lat_to_world_y, lon_to_world_x, snap_to_edge, TileCoord};

/// An inclusive rectangular range of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub z: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    /// The tile range whose interiors meet a world-space rectangle.
    ///
    /// The minimum corner floors into its tile; the maximum corner is treated
    /// as exclusive, so an edge lying exactly on a tile boundary does not
    /// claim the next tile. Corners within [`EDGE_TOLERANCE`] of a tile
    /// boundary are snapped onto it first. Degenerate (zero-width) rectangles
    /// still yield the tile containing them.
    ///
    /// [`EDGE_TOLERANCE`]: crate::coord::EDGE_TOLERANCE
    pub fn from_world_rect(bounds: Rect<f64>, zoom: u8) -> Self {
        let n = TileCoord::tiles_per_side(zoom) as f64;
        let scaled = |world: f64| snap_to_edge(world * n, zoom);
        let min_x = clamp_index(scaled(bounds.min().x), zoom);
        let min_y = clamp_index(scaled(bounds.min().y), zoom);
        let max_x = last_index(scaled(bounds.max().x), zoom).max(min_x);
        let max_y = last_index(scaled(bounds.max().y), zoom).max(min_y);
        Self {
            z: zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The full range of descendants of `tile` at `zoom` (`zoom >= tile.z`).
    pub fn descendants(tile: &TileCoord, zoom: u8) -> Self {
        let shift = zoom - tile.z;
        let span = 1u32 << shift;
        Self {
            z: zoom,
            min_x: tile.x << shift,
            min_y: tile.y << shift,
            max_x: (tile.x << shift) + (span - 1),
            max_y: (tile.y << shift) + (span - 1),
        }
    }

    pub fn width(&self) -> u64 {
        u64::from(self.max_x - self.min_x) + 1
    }

    pub fn height(&self) -> u64 {
        u64::from(self.max_y - self.min_y) + 1
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> u64 {
        self.width() * self.height()
    }

    /// Always false; a range holds at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.z == self.z
            && (self.min_x..=self.max_x).contains(&tile.x)
            && (self.min_y..=self.max_y).contains(&tile.y)
    }

    /// The overlap of two ranges at the same zoom, if any.
    pub fn intersection(&self, other: &TileRange) -> Option<TileRange> {
        if self.z != other.z {
            return None;
        }
        let range = TileRange {
            z: self.z,
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        (range.min_x <= range.max_x && range.min_y <= range.max_y).then_some(range)
    }

    /// Tiles in ascending `(x, y)` order, matching `TileCoord` ordering.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> {
        let Self {
            z,
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| TileCoord::new(z, x, y)))
    }
}

/// Rounds an exclusive fractional upper bound down to the last tile index it reaches.
#[inline]
fn last_index(fractional: f64, zoom: u8) -> u32 {
    let last = (TileCoord::tiles_per_side(zoom) - 1) as f64;
    (fractional.ceil() - 1.0).clamp(0.0, last) as u32
}

/// The tile range spanned by a geographic geometry's bounding box at `zoom`.
///
/// Returns `None` for empty geometries.
pub fn bbox_range(geometry: &Geometry<f64>, zoom: u8) -> Option<TileRange> {
    let bounds = geometry.bounding_rect()?;

    // North maps to smaller world y, so the latitude corners swap.
    let world = Rect::new(
        coord! { x: lon_to_world_x(bounds.min().x), y: lat_to_world_y(bounds.max().y) },
        coord! { x: lon_to_world_x(bounds.max().x), y: lat_to_world_y(bounds.min().y) },
    );
    Some(TileRange::from_world_rect(world, zoom))
}
