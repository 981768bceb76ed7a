//! `tilecache tiles`: print the tiles covering a viewport.

use clap::Args;

use tilecache::coord::Extent;
use tilecache::tiler::{Tiler, Viewport};

use super::common::parse_bbox;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct TilesArgs {
    /// Viewport as west,south,east,north in degrees
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Extent,

    /// Viewport zoom (may be fractional)
    #[arg(long)]
    pub zoom: f64,

    /// Lowest tile zoom (defaults to --zoom)
    #[arg(long)]
    pub min_zoom: Option<f64>,

    /// Highest tile zoom (defaults to --zoom)
    #[arg(long)]
    pub max_zoom: Option<f64>,

    /// Extra rings of tiles around the viewport
    #[arg(long, default_value = "0")]
    pub margin: u32,

    /// Skip the tiles around (0, 0)
    #[arg(long)]
    pub skip_null_island: bool,
}

/// Run the tiles command.
pub fn run(args: TilesArgs) -> Result<(), CliError> {
    let min = args.min_zoom.unwrap_or(args.zoom);
    let max = args.max_zoom.unwrap_or(args.zoom);
    let tiler = Tiler::new()
        .zoom_range(min, max)
        .margin(args.margin)
        .skip_null_island(args.skip_null_island);
    let viewport = Viewport::new(args.bbox, args.zoom);

    let tiles = tiler.tiles(&viewport);
    tracing::debug!(count = tiles.len(), zoom = tiler.zoom_for(&viewport), "Tiles computed");
    for tile in &tiles {
        println!("{}\t{}", tile.id, tile.extent);
    }
    eprintln!("{} tiles", tiles.len());
    Ok(())
}
