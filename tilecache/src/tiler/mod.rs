//! Viewport tiling.
//!
//! The [`Tiler`] turns a [`Viewport`] into the set of Web Mercator tiles that
//! cover it at a single integer zoom. It is pure: the same viewport and
//! configuration always produce the same tiles in the same order (row-major,
//! north to south, west to east).
//!
//! # Example
//!
//! ```
//! use tilecache::coord::Extent;
//! use tilecache::tiler::{Tiler, Viewport};
//!
//! let tiler = Tiler::new().zoom_range(14.0, 14.0).margin(1);
//! let viewport = Viewport::new(Extent::new(13.38, 52.50, 13.42, 52.53), 15.2);
//! let tiles = tiler.tiles(&viewport);
//! assert!(!tiles.is_empty());
//! assert!(tiles.iter().all(|tile| tile.coord.z == 14));
//! ```

use std::fmt;

use crate::coord::{lat_to_tile_y, lon_to_tile_x, tile_extent, Extent, TileCoord, MAX_ZOOM};

/// Zoom at and above which null island tiles are recognised.
const NULL_ISLAND_MIN_ZOOM: u8 = 7;

/// The visible map region plus its zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible geographic extent.
    pub extent: Extent,
    /// Fractional map zoom.
    pub zoom: f64,
}

impl Viewport {
    pub fn new(extent: Extent, zoom: f64) -> Self {
        Self { extent, zoom }
    }
}

/// One tile of a covering set.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDescriptor {
    /// Identifier, `"x,y,z"`.
    pub id: String,
    /// Tile address.
    pub coord: TileCoord,
    /// Geographic extent of the tile.
    pub extent: Extent,
}

impl TileDescriptor {
    pub fn new(coord: TileCoord) -> Self {
        Self {
            id: coord.id(),
            coord,
            extent: tile_extent(&coord),
        }
    }
}

impl fmt::Display for TileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {}", self.id)
    }
}

/// Computes covering tile sets for viewports.
#[derive(Debug, Clone, PartialEq)]
pub struct Tiler {
    min_zoom: f64,
    max_zoom: f64,
    margin: u32,
    skip_null_island: bool,
}

impl Default for Tiler {
    fn default() -> Self {
        Self {
            min_zoom: 0.0,
            max_zoom: MAX_ZOOM as f64,
            margin: 0,
            skip_null_island: false,
        }
    }
}

impl Tiler {
    /// A tiler over the full zoom range with no margin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict tile zooms to `[min, max]`. A single-zoom provider passes the same value twice.
    pub fn zoom_range(mut self, min: f64, max: f64) -> Self {
        let max_allowed = MAX_ZOOM as f64;
        self.min_zoom = min.min(max).clamp(0.0, max_allowed);
        self.max_zoom = max.max(min).clamp(0.0, max_allowed);
        self
    }

    /// Extra rings of tiles around the visible set.
    pub fn margin(mut self, rings: u32) -> Self {
        self.margin = rings;
        self
    }

    /// Exclude the tiles around (0, 0).
    pub fn skip_null_island(mut self, skip: bool) -> Self {
        self.skip_null_island = skip;
        self
    }

    /// Configured zoom range.
    pub fn range(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    /// The integer tile zoom for a viewport: nearest integer to the clamped viewport zoom.
    pub fn zoom_for(&self, viewport: &Viewport) -> u8 {
        let z = viewport.zoom.clamp(self.min_zoom, self.max_zoom).round();
        z.clamp(0.0, MAX_ZOOM as f64) as u8
    }

    /// Coarsest integer zoom this tiler may fall back to.
    pub fn coarsest_zoom(&self) -> u8 {
        self.min_zoom.floor() as u8
    }

    /// Tiles covering the viewport at [`Tiler::zoom_for`].
    pub fn tiles(&self, viewport: &Viewport) -> Vec<TileDescriptor> {
        self.tiles_at_zoom(viewport, self.zoom_for(viewport))
    }

    /// Tiles covering the viewport at an explicit zoom.
    pub fn tiles_at_zoom(&self, viewport: &Viewport, zoom: u8) -> Vec<TileDescriptor> {
        let zoom = zoom.min(MAX_ZOOM);
        let extent = viewport.extent.clamp_to_world();
        let last = (TileCoord::world_size(zoom) - 1) as i64;

        let (x0, x1) = covering_span(
            lon_to_tile_x(extent.min_lon, zoom),
            lon_to_tile_x(extent.max_lon, zoom),
        );
        // Tile rows grow southward.
        let (y0, y1) = covering_span(
            lat_to_tile_y(extent.max_lat, zoom),
            lat_to_tile_y(extent.min_lat, zoom),
        );

        let margin = self.margin as i64;
        let x0 = (x0 - margin).clamp(0, last);
        let x1 = (x1 + margin).clamp(0, last);
        let y0 = (y0 - margin).clamp(0, last);
        let y1 = (y1 + margin).clamp(0, last);

        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let coord = TileCoord::new(x as u32, y as u32, zoom);
                if self.skip_null_island && is_null_island(&coord) {
                    continue;
                }
                tiles.push(TileDescriptor::new(coord));
            }
        }
        tiles
    }
}

/// Inclusive integer tile span covering the fractional range `[lo, hi]`.
fn covering_span(lo: f64, hi: f64) -> (i64, i64) {
    let start = lo.floor() as i64;
    let end = (hi.ceil() as i64 - 1).max(start);
    (start, end)
}

/// Whether a tile lies in the small square of tiles around (0, 0).
///
/// Providers frequently place broken records at null island; below zoom 7 the
/// square would swallow real data, so only finer tiles are recognised.
pub fn is_null_island(tile: &TileCoord) -> bool {
    if tile.z < NULL_ISLAND_MIN_ZOOM {
        return false;
    }
    let center = 1u32 << (tile.z - 1);
    let width = 1u32 << (tile.z - 6);
    let min = center - width / 2;
    let max = center + width / 2 - 1;
    (min..=max).contains(&tile.x) && (min..=max).contains(&tile.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{LonLat, MAX_LAT, MIN_LAT};

    fn berlin() -> Viewport {
        Viewport::new(Extent::new(13.38, 52.50, 13.42, 52.53), 16.0)
    }

    #[test]
    fn test_zoom_for_clamps_and_rounds() {
        let tiler = Tiler::new().zoom_range(14.0, 14.0);
        assert_eq!(tiler.zoom_for(&berlin()), 14);

        let tiler = Tiler::new().zoom_range(12.0, 18.0);
        let viewport = Viewport::new(berlin().extent, 15.6);
        assert_eq!(tiler.zoom_for(&viewport), 16);

        let viewport = Viewport::new(berlin().extent, 4.0);
        assert_eq!(tiler.zoom_for(&viewport), 12);
    }

    #[test]
    fn test_fractional_fixed_zoom_rounds_up() {
        let tiler = Tiler::new().zoom_range(16.5, 16.5);
        assert_eq!(tiler.zoom_for(&berlin()), 17);
        assert_eq!(tiler.coarsest_zoom(), 16);
    }

    #[test]
    fn test_tiles_are_unique_and_at_requested_zoom() {
        let tiler = Tiler::new().zoom_range(16.0, 16.0);
        let tiles = tiler.tiles(&berlin());
        let ids: std::collections::HashSet<_> = tiles.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), tiles.len());
        assert!(tiles.iter().all(|t| t.coord.z == 16));
    }

    #[test]
    fn test_margin_adds_rings() {
        let plain = Tiler::new().zoom_range(14.0, 14.0);
        let padded = plain.clone().margin(2);
        let viewport = Viewport::new(Extent::new(13.401, 52.511, 13.402, 52.512), 14.0);

        let inner = plain.tiles(&viewport);
        assert_eq!(inner.len(), 1);
        assert_eq!(padded.tiles(&viewport).len(), 25);
    }

    #[test]
    fn test_degenerate_viewport_yields_one_tile() {
        let tiler = Tiler::new().zoom_range(15.0, 15.0);
        let point = Extent::from_point(LonLat::new(2.35, 48.85));
        let tiles = tiler.tiles(&Viewport::new(point, 15.0));
        assert_eq!(tiles.len(), 1);
        assert!(tiles[0].extent.contains_point(LonLat::new(2.35, 48.85)));
    }

    #[test]
    fn test_null_island_tiles_skipped() {
        let viewport = Viewport::new(Extent::new(-0.01, -0.01, 0.01, 0.01), 14.0);
        let with = Tiler::new().zoom_range(14.0, 14.0);
        let without = with.clone().skip_null_island(true);

        assert!(!with.tiles(&viewport).is_empty());
        assert!(without.tiles(&viewport).is_empty());
    }

    #[test]
    fn test_is_null_island_bounds() {
        // At z7 the square is tiles 63..=64 on both axes.
        assert!(is_null_island(&TileCoord::new(63, 64, 7)));
        assert!(!is_null_island(&TileCoord::new(62, 64, 7)));
        assert!(!is_null_island(&TileCoord::new(32, 32, 6)));
    }

    #[test]
    fn test_world_edges_are_clamped() {
        let tiler = Tiler::new().zoom_range(2.0, 2.0).margin(3);
        let viewport = Viewport::new(Extent::new(-180.0, MIN_LAT, 180.0, MAX_LAT), 2.0);
        let tiles = tiler.tiles(&viewport);
        assert_eq!(tiles.len(), 16);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_union_of_tiles_covers_viewport(
                lon in -179.0..179.0_f64,
                lat in -80.0..80.0_f64,
                width in 0.0001..0.5_f64,
                height in 0.0001..0.5_f64,
                zoom in 8u8..=18,
                margin in 0u32..3,
            ) {
                let extent = Extent::new(lon, lat, lon + width, lat + height);
                let tiler = Tiler::new().zoom_range(zoom as f64, zoom as f64).margin(margin);
                let tiles = tiler.tiles(&Viewport::new(extent, zoom as f64));
                prop_assert!(!tiles.is_empty());

                let mut union = tiles[0].extent;
                for tile in &tiles[1..] {
                    union = union.union(&tile.extent);
                }
                let eps = 1e-9;
                prop_assert!(union.min_lon <= extent.min_lon + eps);
                prop_assert!(union.max_lon >= extent.max_lon - eps);
                prop_assert!(union.min_lat <= extent.min_lat + eps);
                prop_assert!(union.max_lat >= extent.max_lat - eps);
            }

            #[test]
            fn test_tiling_is_deterministic(
                lon in -179.0..179.0_f64,
                lat in -80.0..80.0_f64,
                zoom in 10u8..=17,
            ) {
                let extent = Extent::new(lon, lat, lon + 0.05, lat + 0.05);
                let tiler = Tiler::new().zoom_range(zoom as f64, zoom as f64).margin(1);
                let viewport = Viewport::new(extent, zoom as f64);
                prop_assert_eq!(tiler.tiles(&viewport), tiler.tiles(&viewport));
            }
        }
    }
}
