//! `overlays` command: list loose-tile overlay directories.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_OVERLAY_PATH, CliError, ENV_OVERLAY_PATH, write_json};

/// CLI arguments for the `overlays` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "List overlay directories as JSON")]
#[ortho_config(prefix = "MAPVIEW")]
pub(crate) struct OverlaysArgs {
    /// Directory whose subdirectories hold `{z}/{x}/{y}.png` tiles.
    #[arg(long = ARG_OVERLAY_PATH, value_name = "dir")]
    #[serde(default)]
    pub(crate) overlay_path: Option<Utf8PathBuf>,
}

pub(crate) fn run_overlays(args: OverlaysArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let root = overlay_root(merged)?;
    let overlays = mapview_data::overlays::discover(&root)?;
    write_json(writer, &overlays)
}

pub(crate) fn overlay_root(args: OverlaysArgs) -> Result<Utf8PathBuf, CliError> {
    args.overlay_path.ok_or(CliError::MissingArgument {
        field: ARG_OVERLAY_PATH,
        env: ENV_OVERLAY_PATH,
    })
}
