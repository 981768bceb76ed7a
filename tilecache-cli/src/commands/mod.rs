//! CLI subcommands.

pub mod common;
pub mod replay;
pub mod tiles;
