//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, plus the small amount of local metric
//! geometry the engine needs (metres ↔ degrees, planar distances).

mod types;

pub use types::{
    CoordError, Extent, LonLat, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// WGS84 equatorial radius in metres.
pub const EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

/// WGS84 polar radius in metres.
pub const POLAR_RADIUS_M: f64 = 6_356_752.314_245_179;

/// Fractional tile X coordinate of a longitude at the given zoom.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    (lon + 180.0) / 360.0 * n
}

/// Fractional tile Y coordinate of a latitude at the given zoom.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lat * PI / 180.0;
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 24)
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
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    // The eastern and southern edges belong to the last tile, not a tile past the world.
    let last = TileCoord::world_size(zoom) - 1;
    let x = (lon_to_tile_x(lon, zoom) as u32).min(last);
    let y = (lat_to_tile_y(lat, zoom) as u32).min(last);

    Ok(TileCoord { x, y, z: zoom })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.z as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Geographic extent covered by a tile.
pub fn tile_extent(tile: &TileCoord) -> Extent {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) = tile_to_lat_lon(&TileCoord {
        x: tile.x + 1,
        y: tile.y + 1,
        z: tile.z,
    });
    Extent::new(west, south, east, north)
}

/// Degrees of latitude spanned by `meters` northward.
#[inline]
pub fn meters_to_lat(meters: f64) -> f64 {
    meters / (POLAR_RADIUS_M * 2.0 * PI / 360.0)
}

/// Degrees of longitude spanned by `meters` eastward at latitude `at_lat`.
#[inline]
pub fn meters_to_lon(meters: f64, at_lat: f64) -> f64 {
    let lat_rad = at_lat.to_radians();
    meters / (EQUATORIAL_RADIUS_M * 2.0 * PI / 360.0 * lat_rad.cos().abs().max(1e-12))
}

/// Offset of `point` from `origin` in a local east/north metric frame.
pub fn local_offset_meters(origin: LonLat, point: LonLat) -> (f64, f64) {
    let east = (point.lon - origin.lon) / meters_to_lon(1.0, origin.lat);
    let north = (point.lat - origin.lat) / meters_to_lat(1.0);
    (east, north)
}

/// Inverse of [`local_offset_meters`].
pub fn offset_to_lon_lat(origin: LonLat, east: f64, north: f64) -> LonLat {
    LonLat::new(
        origin.lon + meters_to_lon(east, origin.lat),
        origin.lat + meters_to_lat(north),
    )
}

/// Approximate ground distance in metres (equirectangular, good at street scale).
pub fn distance_meters(a: LonLat, b: LonLat) -> f64 {
    let (east, north) = local_offset_meters(a, b);
    east.hypot(north)
}
