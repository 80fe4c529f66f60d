//! Error types emitted by the map viewer CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mapview_core::TileCoordinateError;
use mapview_data::{ArchiveError, DiscoveryError, ResolverBuildError};
use thiserror::Error;

/// Errors emitted by the map viewer CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The requested tile address is outside the tile grid.
    #[error(transparent)]
    InvalidTile(#[from] TileCoordinateError),
    /// Opening or reading the tile archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// The archive holds no tile at the requested address.
    #[error("tile {tile} is not stored in {path:?}")]
    TileNotFound { tile: String, path: Utf8PathBuf },
    /// Scanning for overlays failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Building the protocol resolver failed.
    #[error(transparent)]
    BuildResolver(#[from] ResolverBuildError),
    /// Starting the async runtime failed.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output to {target}: {source}")]
    WriteOutput {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub(crate) fn stdout(source: std::io::Error) -> Self {
        Self::WriteOutput {
            target: "stdout".to_owned(),
            source,
        }
    }
}
