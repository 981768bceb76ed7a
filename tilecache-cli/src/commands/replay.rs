//! `tilecache replay`: run the engine over a local record set.
//!
//! Loads records from a JSON file, serves them through an in-memory fetcher,
//! loads the given viewport to completion and reports what ended up cached.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use tilecache::coord::Extent;
use tilecache::provider::RecordSetFetcher;
use tilecache::stepper::Direction;
use tilecache::tiler::Viewport;
use tilecache::ProviderService;

use super::common::{parse_bbox, resolve_config};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON array of records to serve
    #[arg(long)]
    pub records: PathBuf,

    /// Viewport as west,south,east,north in degrees
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Extent,

    /// Viewport zoom (may be fractional)
    #[arg(long)]
    pub zoom: f64,

    /// Provider configuration file (INI)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Built-in provider profile, used when no --config is given
    #[arg(long)]
    pub preset: Option<String>,

    /// Simulated per-request latency in milliseconds
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,

    /// Capture id to step from after loading
    #[arg(long)]
    pub step_from: Option<String>,

    /// Step direction: forward or backward
    #[arg(long, default_value = "forward")]
    pub direction: Direction,

    /// Viewer yaw relative to the capture heading, in degrees
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub yaw: f64,
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let config = resolve_config(args.config.as_deref(), args.preset.as_deref())?;
    let features = config
        .schema
        .load(&args.records)
        .map_err(|error| CliError::Records {
            path: args.records.display().to_string(),
            error,
        })?;
    tracing::info!(
        provider = %config.profile.name,
        records = features.len(),
        "Loaded record set"
    );

    let mut fetcher = RecordSetFetcher::new(config.profile.name.clone(), features);
    if args.latency_ms > 0 {
        fetcher = fetcher.with_latency(Duration::from_millis(args.latency_ms));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let viewport = Viewport::new(args.bbox, args.zoom);
    let mut service = ProviderService::new(config.profile, Arc::new(fetcher));

    runtime.block_on(async {
        service.load_for_viewport(&viewport);
        service.settle().await;
    });

    println!("provider:  {}", service.name());
    println!("tiles:     {}", service.loaded_tile_count());
    println!("features:  {}", service.feature_count());
    println!("in view:   {}", service.query(&viewport.extent).len());
    if service.profile().is_imagery() {
        println!("sequences: {}", service.sequence_count());
        for sequence in service.sequences_in(&viewport.extent) {
            println!("  {} ({} captures)", sequence.id, sequence.len());
        }
    }

    if let Some(from) = &args.step_from {
        match service.step(from, args.direction, args.yaw) {
            Some(feature) => println!(
                "step {:?} from {}: {} at {}",
                args.direction, from, feature.id, feature.loc
            ),
            None => println!("step {:?} from {}: none", args.direction, from),
        }
    }
    Ok(())
}
