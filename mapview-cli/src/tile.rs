//! `tile` command: extract one tile from an archive.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use mapview_core::TileCoordinate;
use mapview_data::TileArchive;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_ARCHIVE, ARG_OUTPUT, ARG_X, ARG_Y, ARG_ZOOM, CliError, ENV_TILE_ARCHIVE, ENV_TILE_X,
    ENV_TILE_Y, ENV_TILE_ZOOM,
};

/// CLI arguments for the `tile` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read the tile at the given XYZ address from an MBTiles \
                 archive, inflating gzip or zlib payloads. The bytes go to \
                 --output when given and to stdout otherwise.",
    about = "Extract one decompressed tile from an archive"
)]
#[ortho_config(prefix = "MAPVIEW")]
pub(crate) struct TileArgs {
    /// Path to the MBTiles archive.
    #[arg(long = ARG_ARCHIVE, value_name = "path")]
    #[serde(default)]
    pub(crate) archive: Option<Utf8PathBuf>,
    /// Zoom level.
    #[arg(long = ARG_ZOOM, value_name = "z")]
    #[serde(default)]
    pub(crate) zoom: Option<u8>,
    /// Column, counted west to east.
    #[arg(long = ARG_X, value_name = "x")]
    #[serde(default)]
    pub(crate) x: Option<u32>,
    /// Row, counted north to south.
    #[arg(long = ARG_Y, value_name = "y")]
    #[serde(default)]
    pub(crate) y: Option<u32>,
    /// File to write the tile to.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

/// Resolved `tile` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TileConfig {
    pub(crate) archive: Utf8PathBuf,
    pub(crate) tile: TileCoordinate,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<TileArgs> for TileConfig {
    type Error = CliError;

    fn try_from(args: TileArgs) -> Result<Self, Self::Error> {
        let archive = args.archive.ok_or(CliError::MissingArgument {
            field: ARG_ARCHIVE,
            env: ENV_TILE_ARCHIVE,
        })?;
        let zoom = args.zoom.ok_or(CliError::MissingArgument {
            field: ARG_ZOOM,
            env: ENV_TILE_ZOOM,
        })?;
        let x = args.x.ok_or(CliError::MissingArgument {
            field: ARG_X,
            env: ENV_TILE_X,
        })?;
        let y = args.y.ok_or(CliError::MissingArgument {
            field: ARG_Y,
            env: ENV_TILE_Y,
        })?;
        Ok(Self {
            archive,
            tile: TileCoordinate::new(zoom, x, y)?,
            output: args.output,
        })
    }
}

pub(crate) fn run_tile(args: TileArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = TileConfig::try_from(merged)?;
    extract_tile(&config, writer)
}

pub(crate) fn extract_tile(config: &TileConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let archive = TileArchive::open(config.archive.as_std_path())?;
    let body = archive
        .tile(config.tile)?
        .ok_or_else(|| CliError::TileNotFound {
            tile: config.tile.to_string(),
            path: config.archive.clone(),
        })?;
    match &config.output {
        Some(path) => {
            mapview_fs::write_bytes(path, &body).map_err(|source| CliError::WriteOutput {
                target: path.to_string(),
                source,
            })?;
            info!("wrote {} bytes for tile {} to {path}", body.len(), config.tile);
        }
        None => writer.write_all(&body).map_err(CliError::stdout)?,
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<TileConfig, CliError> {
    let merged = TileArgs::merge_from_layers(layers).map_err(CliError::from)?;
    TileConfig::try_from(merged)
}
