//! Exact tile coverage by quadtree descent.
//!
//! The geometry is projected into world space once, then the tile pyramid is
//! walked from the root tile. At each tile:
//!
//! 1. Tiles whose descendants fall outside the bounding range are skipped
//!    without touching the geometry.
//! 2. Tiles whose interior does not meet the geometry are pruned.
//! 3. Tiles the geometry contains emit every descendant at the target zoom.
//! 4. Everything else subdivides until the target zoom is reached.
//!
//! Areal geometries use the interior/interior cell of the DE-9IM matrix
//! against the tile shrunk by [`EDGE_TOLERANCE`], so edge contact (or a
//! projection sliver along an edge) never claims a tile. Zero-area geometries (points,
//! collapsed rings) have no interior and fall back to plain intersection,
//! clipped to the bounding range.

use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::{coord, Area, Geometry, Intersects, Rect, Relate};

use super::bbox::TileRange;
use crate::coord::{TileCoord, EDGE_TOLERANCE};
use crate::geometry::project_to_world;

/// How a tile relates to the geometry being covered.
enum TileClass {
    Outside,
    Partial,
    Inside,
}

/// Covers a validated, non-empty geographic geometry within `range`.
pub(super) fn cover_exact(geometry: &Geometry<f64>, range: TileRange) -> Vec<TileCoord> {
    if range.len() == 1 {
        // Anything with a bounding box in a single tile occupies that tile.
        return range.iter().collect();
    }

    let world = project_to_world(geometry);
    let areal = world.unsigned_area() > 0.0;
    let zoom = range.z;

    let mut tiles = Vec::new();
    let mut stack = vec![TileCoord::new(0, 0, 0)];

    while let Some(tile) = stack.pop() {
        let Some(reach) = TileRange::descendants(&tile, zoom).intersection(&range) else {
            continue;
        };

        match classify(&world, areal, &tile) {
            TileClass::Outside => {}
            TileClass::Inside if tile.z < zoom => tiles.extend(reach.iter()),
            _ if tile.z == zoom => tiles.push(tile),
            _ => stack.extend(tile.children()),
        }
    }

    tiles.sort_unstable();
    tiles
}

fn classify(world: &Geometry<f64>, areal: bool, tile: &TileCoord) -> TileClass {
    let rect = tile.world_bounds();

    if !areal {
        return if world.intersects(&rect) {
            TileClass::Partial
        } else {
            TileClass::Outside
        };
    }

    let matrix = world.relate(&shrink(rect, EDGE_TOLERANCE));
    if matrix.get(CoordPos::Inside, CoordPos::Inside) == Dimensions::Empty {
        TileClass::Outside
    } else if matrix.is_contains() {
        TileClass::Inside
    } else {
        TileClass::Partial
    }
}

fn shrink(rect: Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        coord! { x: rect.min().x + by, y: rect.min().y + by },
        coord! { x: rect.max().x - by, y: rect.max().y - by },
    )
}
