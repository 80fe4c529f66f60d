//! `inspect` command: summarise a tile archive.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::warn;
use mapview_data::{ArchiveError, TileArchive};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_ARCHIVE, CliError, ENV_INSPECT_ARCHIVE, write_json};

/// CLI arguments for the `inspect` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Print tile archive metadata and tile count as JSON")]
#[ortho_config(prefix = "MAPVIEW")]
pub(crate) struct InspectArgs {
    /// Path to the MBTiles archive.
    #[arg(long = ARG_ARCHIVE, value_name = "path")]
    #[serde(default)]
    pub(crate) archive: Option<Utf8PathBuf>,
}

/// Resolved `inspect` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InspectConfig {
    pub(crate) archive: Utf8PathBuf,
}

impl TryFrom<InspectArgs> for InspectConfig {
    type Error = CliError;

    fn try_from(args: InspectArgs) -> Result<Self, Self::Error> {
        let archive = args.archive.ok_or(CliError::MissingArgument {
            field: ARG_ARCHIVE,
            env: ENV_INSPECT_ARCHIVE,
        })?;
        Ok(Self { archive })
    }
}

/// JSON summary printed by `inspect`.
#[derive(Debug, Serialize)]
pub(crate) struct ArchiveSummary<'a> {
    pub(crate) path: &'a str,
    pub(crate) tiles: usize,
    pub(crate) content_type: &'static str,
    pub(crate) min_zoom: Option<u8>,
    pub(crate) max_zoom: Option<u8>,
    pub(crate) bounds: Option<[f64; 4]>,
    pub(crate) center: Option<[f64; 2]>,
    pub(crate) metadata: &'a mapview_data::ArchiveMetadata,
}

pub(crate) fn run_inspect(args: InspectArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = InspectConfig::try_from(merged)?;
    let archive = TileArchive::open(config.archive.as_std_path())?;
    let summary = summarise(config.archive.as_str(), &archive);
    write_json(writer, &summary)
}

pub(crate) fn summarise<'a>(path: &'a str, archive: &'a TileArchive) -> ArchiveSummary<'a> {
    let metadata = archive.metadata();
    ArchiveSummary {
        path,
        tiles: archive.len(),
        content_type: metadata.content_type(),
        min_zoom: lenient(metadata.min_zoom()),
        max_zoom: lenient(metadata.max_zoom()),
        bounds: lenient(metadata.bounds()).map(|rect| {
            let (min, max) = (rect.min(), rect.max());
            [min.x, min.y, max.x, max.y]
        }),
        center: lenient(metadata.center()).map(|(point, _)| [point.x, point.y]),
        metadata,
    }
}

fn lenient<T>(value: Result<Option<T>, ArchiveError>) -> Option<T> {
    value.unwrap_or_else(|error| {
        warn!("{error}");
        None
    })
}
