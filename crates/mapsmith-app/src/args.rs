//! Command-line argument definitions for the `mapsmith` binary.

use crate::shortcuts::ShortcutRegistry;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

/// Inspect and edit a Mapsmith map from the command line
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "mapsmith", version, about, long_about = None)]
#[command(after_long_help = ShortcutRegistry::help_text())]
pub struct Args {
    /// Path to the map file (JSON)
    pub map: PathBuf,

    /// Path to an editor settings file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do with the loaded map.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print a summary of the map (default)
    Info,
    /// Project a point onto the nearest wall
    Project {
        #[arg(value_parser = parse_coord, allow_negative_numbers = true)]
        x: f64,
        #[arg(value_parser = parse_coord, allow_negative_numbers = true)]
        y: f64,
    },
    /// Write the map back, after load-time repairs
    Save {
        /// Destination file; defaults to the map itself
        out: Option<PathBuf>,
    },
}

impl Args {
    /// The requested command, `info` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Info)
    }
}

fn parse_coord(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{}' is not a coordinate", value))
}
