//! Coordinate types: geographic points, extents, and Web Mercator tiles.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.051_128_78;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_78;

/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;

/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum zoom level the tiler will produce.
pub const MAX_ZOOM: u8 = 24;

/// Errors from coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range.
    #[error("invalid latitude {0} (expected -85.0511..=85.0511)")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("invalid longitude {0} (expected -180..=180)")]
    InvalidLongitude(f64),

    /// Zoom level above [`MAX_ZOOM`].
    #[error("invalid zoom level {0} (max 24)")]
    InvalidZoom(u8),
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// The point as an `[x, y]` pair for the spatial index.
    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// Axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Westernmost longitude.
    pub min_lon: f64,
    /// Southernmost latitude.
    pub min_lat: f64,
    /// Easternmost longitude.
    pub max_lon: f64,
    /// Northernmost latitude.
    pub max_lat: f64,
}

impl Extent {
    /// Create an extent from its west, south, east and north edges.
    ///
    /// Edges are normalized so that `min <= max` on both axes.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon: min_lon.min(max_lon),
            min_lat: min_lat.min(max_lat),
            max_lon: min_lon.max(max_lon),
            max_lat: min_lat.max(max_lat),
        }
    }

    /// A zero-area extent at a single point.
    pub fn from_point(point: LonLat) -> Self {
        Self {
            min_lon: point.lon,
            min_lat: point.lat,
            max_lon: point.lon,
            max_lat: point.lat,
        }
    }

    /// Smallest extent containing all of `points`, or `None` if empty.
    pub fn from_points(points: impl IntoIterator<Item = LonLat>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut extent = Self::from_point(first);
        for point in iter {
            extent.expand(point);
        }
        Some(extent)
    }

    /// Grow this extent to include a point.
    pub fn expand(&mut self, point: LonLat) {
        self.min_lon = self.min_lon.min(point.lon);
        self.min_lat = self.min_lat.min(point.lat);
        self.max_lon = self.max_lon.max(point.lon);
        self.max_lat = self.max_lat.max(point.lat);
    }

    /// Smallest extent containing both extents.
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Whether the point lies inside or on the boundary.
    pub fn contains_point(&self, point: LonLat) -> bool {
        point.lon >= self.min_lon
            && point.lon <= self.max_lon
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }

    /// Whether the two extents overlap (touching edges count).
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Center point of the extent.
    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True when the extent has zero width or height.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Clamp to the Web Mercator world.
    pub fn clamp_to_world(&self) -> Extent {
        Extent {
            min_lon: self.min_lon.clamp(MIN_LON, MAX_LON),
            min_lat: self.min_lat.clamp(MIN_LAT, MAX_LAT),
            max_lon: self.max_lon.clamp(MIN_LON, MAX_LON),
            max_lat: self.max_lat.clamp(MIN_LAT, MAX_LAT),
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// A Web Mercator tile address.
///
/// `x` grows eastward from the antimeridian, `y` grows southward from the
/// northern edge of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Stable string identifier, `"x,y,z"`.
    pub fn id(&self) -> String {
        format!("{},{},{}", self.x, self.y, self.z)
    }

    /// Number of tiles along one axis at this zoom.
    pub fn world_size(z: u8) -> u32 {
        1u32 << z
    }

    /// The tile one zoom level coarser that contains this one.
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord {
            x: self.x / 2,
            y: self.y / 2,
            z: self.z - 1,
        })
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_new_normalizes_edges() {
        let extent = Extent::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(extent.min_lon, -10.0);
        assert_eq!(extent.max_lon, 10.0);
        assert_eq!(extent.min_lat, -5.0);
        assert_eq!(extent.max_lat, 5.0);
    }

    #[test]
    fn test_extent_from_points() {
        let extent = Extent::from_points([
            LonLat::new(1.0, 2.0),
            LonLat::new(-3.0, 4.0),
            LonLat::new(0.5, -1.0),
        ])
        .unwrap();
        assert_eq!(extent, Extent::new(-3.0, -1.0, 1.0, 4.0));
        assert!(Extent::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_extent_intersects_touching_edges() {
        let a = Extent::new(0.0, 0.0, 1.0, 1.0);
        let b = Extent::new(1.0, 0.0, 2.0, 1.0);
        let c = Extent::new(1.5, 1.5, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_extent_degenerate() {
        assert!(Extent::from_point(LonLat::new(1.0, 1.0)).is_degenerate());
        assert!(!Extent::new(0.0, 0.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn test_tile_id_format() {
        assert_eq!(TileCoord::new(3, 5, 7).id(), "3,5,7");
    }

    #[test]
    fn test_tile_parent() {
        let tile = TileCoord::new(9, 4, 4);
        assert_eq!(tile.parent(), Some(TileCoord::new(4, 2, 3)));
        assert_eq!(TileCoord::new(0, 0, 0).parent(), None);
    }
}
