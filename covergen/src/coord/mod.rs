//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! normalized Web Mercator world space, and slippy-map tile coordinates.
//!
//! World space is the unit square `[0, 1] × [0, 1]` with `y` growing south.
//! A tile `(z, x, y)` occupies `[x / 2^z, (x + 1) / 2^z] × [y / 2^z, (y + 1) / 2^z]`,
//! so scaling a world coordinate by `2^z` yields fractional tile coordinates
//! exactly (the scale factor is a power of two).

mod types;

pub use types::{
    CoordError, TileCoord, ZoomRange, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_LAT, MAX_LON,
    MAX_SUPPORTED_ZOOM, MIN_LAT, MIN_LON,
};

use geo::{coord, Coord, Rect};
use std::f64::consts::PI;

/// Projects a longitude onto the world x axis, clamping to `[-180, 180]`.
#[inline]
pub fn lon_to_world_x(lon: f64) -> f64 {
    (lon.clamp(MIN_LON, MAX_LON) + 180.0) / 360.0
}

/// Projects a latitude onto the world y axis, clamping to the Web Mercator limits.
#[inline]
pub fn lat_to_world_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT).to_radians();
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0
}

/// Projects a geographic coordinate (`x` = longitude, `y` = latitude) into world space.
#[inline]
pub fn to_world(c: Coord<f64>) -> Coord<f64> {
    coord! { x: lon_to_world_x(c.x), y: lat_to_world_y(c.y) }
}

/// Inverse of [`to_world`]: returns `(lat, lon)` for a world-space coordinate.
#[inline]
pub fn world_to_lat_lon(c: Coord<f64>) -> (f64, f64) {
    let lon = c.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * c.y)).sinh().atan().to_degrees();
    (lat, lon)
}

/// Converts a world-space coordinate to the tile containing it at `zoom`.
///
/// Coordinates on the far east or south edge of the world map to the last
/// tile rather than one past it.
#[inline]
pub fn world_to_tile(c: Coord<f64>, zoom: u8) -> TileCoord {
    let n = TileCoord::tiles_per_side(zoom) as f64;
    TileCoord::new(zoom, clamp_index(c.x * n, zoom), clamp_index(c.y * n, zoom))
}

/// World-space distance within which a coordinate counts as lying on a tile
/// edge.
///
/// Projecting latitude to world space and back drifts by a few ULPs, so a
/// polygon built from a tile's geographic bounds lands just outside the
/// tile. The tolerance is far below the width of a zoom-30 tile (`~9.3e-10`).
pub const EDGE_TOLERANCE: f64 = 1e-12;

/// Snaps a fractional tile index onto the nearest tile edge when it lies
/// within [`EDGE_TOLERANCE`] of it.
#[inline]
pub(crate) fn snap_to_edge(fractional: f64, zoom: u8) -> f64 {
    let edge = fractional.round();
    let tolerance = EDGE_TOLERANCE * TileCoord::tiles_per_side(zoom) as f64;
    if (fractional - edge).abs() <= tolerance {
        edge
    } else {
        fractional
    }
}

/// Floors a fractional tile index and clamps it into `[0, 2^zoom)`.
#[inline]
pub(crate) fn clamp_index(fractional: f64, zoom: u8) -> u32 {
    let last = (TileCoord::tiles_per_side(zoom) - 1) as f64;
    fractional.floor().clamp(0.0, last) as u32
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 30)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_SUPPORTED_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    Ok(world_to_tile(to_world(coord! { x: lon, y: lat }), zoom))
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    world_to_lat_lon(tile.world_bounds().min())
}

/// Geographic bounds of a tile as a rectangle with `x` = longitude, `y` = latitude.
pub fn tile_geo_bounds(tile: &TileCoord) -> Rect<f64> {
    let world = tile.world_bounds();
    let (north, west) = world_to_lat_lon(world.min());
    let (south, east) = world_to_lat_lon(world.max());
    Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_york_city_at_zoom_16() {
        // New York City: 40.7128°N, 74.0060°W
        let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.y, 24640);
        assert_eq!(tile.x, 19295);
        assert_eq!(tile.z, 16);
    }

    #[test]
    fn test_origin_at_zoom_0_and_1() {
        assert_eq!(to_tile_coords(0.0, 0.0, 0).unwrap(), TileCoord::new(0, 0, 0));
        assert_eq!(to_tile_coords(0.0, 0.0, 1).unwrap(), TileCoord::new(1, 1, 1));
        assert_eq!(to_tile_coords(45.0, -90.0, 1).unwrap(), TileCoord::new(1, 0, 0));
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_invalid_zoom() {
        let result = to_tile_coords(0.0, 0.0, 31);
        assert!(matches!(result, Err(CoordError::InvalidZoom(31))));
    }

    #[test]
    fn test_east_and_south_edges_clamp_to_last_tile() {
        let tile = to_tile_coords(MIN_LAT, MAX_LON, 4).unwrap();
        assert_eq!(tile, TileCoord::new(4, 15, 15));
    }

    #[test]
    fn test_tile_to_lat_lon_northwest_corner() {
        let tile = TileCoord::new(16, 19295, 24640);
        let (lat, lon) = tile_to_lat_lon(&tile);

        assert!((lat - 40.713).abs() < 0.01, "Latitude should be close to 40.713");
        assert!((lon - (-74.007)).abs() < 0.01, "Longitude should be close to -74.007");
    }

    #[test]
    fn test_tile_geo_bounds_world_tile() {
        let bounds = tile_geo_bounds(&TileCoord::new(0, 0, 0));
        assert!((bounds.min().x - MIN_LON).abs() < 1e-9);
        assert!((bounds.max().x - MAX_LON).abs() < 1e-9);
        assert!(bounds.min().y < -85.0);
        assert!(bounds.max().y > 85.0);
    }

    #[test]
    fn test_tile_center_maps_back_to_tile() {
        for zoom in 0..=20 {
            let n = TileCoord::tiles_per_side(zoom) as u32;
            let tile = TileCoord::new(zoom, (n - 1).min(100), (n - 1).min(200));
            let bounds = tile_geo_bounds(&tile);
            let center = bounds.center();

            let back = to_tile_coords(center.y, center.x, zoom).unwrap();
            assert_eq!(back, tile, "Round-trip failed at zoom {}", zoom);
        }
    }

    #[test]
    fn test_world_projection_is_monotonic_in_latitude() {
        // Northern latitudes have smaller world y
        assert!(lat_to_world_y(60.0) < lat_to_world_y(0.0));
        assert!(lat_to_world_y(0.0) < lat_to_world_y(-60.0));
        assert!((lat_to_world_y(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_children_and_parent() {
        let tile = TileCoord::new(10, 300, 401);
        for child in tile.children() {
            assert_eq!(child.z, 11);
            assert_eq!(child.parent(), Some(tile));
        }
        assert_eq!(TileCoord::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn test_snap_to_edge() {
        assert_eq!(snap_to_edge(14.0 + 1e-12, 10), 14.0);
        assert_eq!(snap_to_edge(14.0 - 1e-12, 10), 14.0);
        assert_eq!(snap_to_edge(14.25, 10), 14.25);
        // The tolerance scales with the zoom so it stays constant in world space.
        assert_eq!(snap_to_edge(7.0 + 1e-4, 30), 7.0);
        assert_eq!(snap_to_edge(7.0 + 1e-4, 10), 7.0 + 1e-4);
    }

    #[test]
    fn test_zoom_range_validation() {
        assert!(ZoomRange::new(10, 22).is_ok());
        assert!(matches!(
            ZoomRange::new(12, 10),
            Err(CoordError::InvalidZoomRange { min: 12, max: 10 })
        ));
        assert!(matches!(ZoomRange::new(0, 31), Err(CoordError::InvalidZoom(31))));

        let range = ZoomRange::default();
        assert_eq!(range.min(), 10);
        assert_eq!(range.max(), 22);
        assert_eq!(range.len(), 13);
        assert_eq!(range.iter().collect::<Vec<_>>().first(), Some(&10));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_coords_in_bounds(
                lat in -85.05..85.05_f64,
                lon in -180.0..=180.0_f64,
                zoom in 0u8..=MAX_SUPPORTED_ZOOM
            ) {
                let tile = to_tile_coords(lat, lon, zoom)?;
                prop_assert!(tile.is_valid(), "{} out of range", tile);
                prop_assert_eq!(tile.z, zoom);
            }

            #[test]
            fn test_point_lies_inside_its_tile(
                lat in -85.0..85.0_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=22
            ) {
                let tile = to_tile_coords(lat, lon, zoom)?;
                let bounds = tile.world_bounds();
                let world = to_world(coord! { x: lon, y: lat });
                prop_assert!(world.x >= bounds.min().x && world.x <= bounds.max().x);
                prop_assert!(world.y >= bounds.min().y && world.y <= bounds.max().y);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                zoom in 10u8..=15
            ) {
                let tile1 = to_tile_coords(lat, lon1, zoom)?;
                let tile2 = to_tile_coords(lat, lon2, zoom)?;
                prop_assert!(tile1.x < tile2.x);
            }

            #[test]
            fn test_reject_invalid_latitude(
                lat in -90.0..-85.06_f64,
                lon in -180.0..180.0_f64,
                zoom in 0u8..=18
            ) {
                let result = to_tile_coords(lat, lon, zoom);
                prop_assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
            }
        }
    }
}
