//! tilecache CLI - Command-line interface
//!
//! This binary exercises the tilecache engine offline: it lists covering
//! tiles for a viewport and replays local record sets through a provider.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilecache::logging::{init_logging, LogConfig};

use commands::replay::ReplayArgs;
use commands::tiles::TilesArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilecache")]
#[command(about = "Viewport-driven tile fetching into a spatial cache", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Also write logs to this file (cleared at start)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tiles covering a viewport
    Tiles(TilesArgs),
    /// Load a viewport from a local record set and report the cache contents
    Replay(ReplayArgs),
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_level(&cli.log_level);
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_file(path);
    }
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let result = match cli.command {
        Command::Tiles(args) => commands::tiles::run(args),
        Command::Replay(args) => commands::replay::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
