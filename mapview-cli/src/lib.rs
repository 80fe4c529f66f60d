//! Command-line interface for inspecting map viewer data.
//!
//! The `mapview` binary stands in for the desktop shell: it opens tile
//! archives, discovers overlays and drives the protocol resolver so the
//! backend can be exercised without a rendering surface.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod error;
mod inspect;
mod overlays;
mod resolve;
mod tile;

pub use error::CliError;

use inspect::InspectArgs;
use overlays::OverlaysArgs;
use resolve::ResolveArgs;
use tile::TileArgs;

const ARG_ARCHIVE: &str = "archive";
const ARG_ZOOM: &str = "zoom";
const ARG_X: &str = "x";
const ARG_Y: &str = "y";
const ARG_OUTPUT: &str = "output";
const ARG_OVERLAY_PATH: &str = "overlay-path";
const ARG_URL: &str = "url";
const ARG_BASE_DIR: &str = "base-dir";
const ARG_ARCHIVE_NAME: &str = "archive-name";
const ARG_FILE_SCHEME: &str = "file-scheme";
const ARG_ARCHIVE_SCHEME: &str = "archive-scheme";
const ENV_INSPECT_ARCHIVE: &str = "MAPVIEW_CMDS_INSPECT_ARCHIVE";
const ENV_TILE_ARCHIVE: &str = "MAPVIEW_CMDS_TILE_ARCHIVE";
const ENV_TILE_ZOOM: &str = "MAPVIEW_CMDS_TILE_ZOOM";
const ENV_TILE_X: &str = "MAPVIEW_CMDS_TILE_X";
const ENV_TILE_Y: &str = "MAPVIEW_CMDS_TILE_Y";
const ENV_OVERLAY_PATH: &str = "MAPVIEW_CMDS_OVERLAYS_OVERLAY_PATH";
const ENV_RESOLVE_URL: &str = "MAPVIEW_CMDS_RESOLVE_URL";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments are invalid or the command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli.command, &mut stdout)
}

fn run_with(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Inspect(args) => inspect::run_inspect(args, writer),
        Command::Tile(args) => tile::run_tile(args, writer),
        Command::Overlays(args) => overlays::run_overlays(args, writer),
        Command::Resolve(args) => resolve::run_resolve(args, writer),
    }
}

fn write_json<T: serde::Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::Serialize)?;
    writeln!(writer, "{payload}").map_err(CliError::stdout)
}

#[derive(Debug, Parser)]
#[command(
    name = "mapview",
    about = "Inspect tile archives, overlays and resource URLs for the map viewer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print tile archive metadata and tile count as JSON.
    Inspect(InspectArgs),
    /// Extract one decompressed tile from an archive.
    Tile(TileArgs),
    /// List overlay directories as JSON.
    Overlays(OverlaysArgs),
    /// Resolve a custom-scheme URL and summarise the response.
    Resolve(ResolveArgs),
}

#[cfg(test)]
mod tests;
