//! `resolve` command: run one URL through the protocol resolver.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapview_data::{ProtocolResolver, ResolverConfig, ResourceResponse};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio::runtime::Builder;

use crate::{
    ARG_ARCHIVE, ARG_ARCHIVE_NAME, ARG_ARCHIVE_SCHEME, ARG_BASE_DIR, ARG_FILE_SCHEME, ARG_URL,
    CliError, ENV_RESOLVE_URL,
};

/// CLI arguments for the `resolve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve a custom-scheme URL the way the rendering surface \
                 would and print the status, headers and body length.",
    about = "Resolve a custom-scheme URL and summarise the response"
)]
#[ortho_config(prefix = "MAPVIEW")]
pub(crate) struct ResolveArgs {
    /// URL to resolve.
    #[arg(value_name = ARG_URL)]
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Directory serving non-archive names of the archive scheme.
    #[arg(long = ARG_BASE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) base_dir: Option<Utf8PathBuf>,
    /// MBTiles archive answering the reserved name.
    #[arg(long = ARG_ARCHIVE, value_name = "path")]
    #[serde(default)]
    pub(crate) archive: Option<Utf8PathBuf>,
    /// Reserved name routed to the archive.
    #[arg(long = ARG_ARCHIVE_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) archive_name: Option<String>,
    /// Scheme mapped onto the local filesystem.
    #[arg(long = ARG_FILE_SCHEME, value_name = "scheme")]
    #[serde(default)]
    pub(crate) file_scheme: Option<String>,
    /// Scheme serving tiles and base-directory resources.
    #[arg(long = ARG_ARCHIVE_SCHEME, value_name = "scheme")]
    #[serde(default)]
    pub(crate) archive_scheme: Option<String>,
}

/// Resolved `resolve` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolveConfig {
    pub(crate) url: String,
    pub(crate) resolver: ResolverConfig,
}

impl TryFrom<ResolveArgs> for ResolveConfig {
    type Error = CliError;

    fn try_from(args: ResolveArgs) -> Result<Self, Self::Error> {
        let url = args.url.ok_or(CliError::MissingArgument {
            field: ARG_URL,
            env: ENV_RESOLVE_URL,
        })?;
        let defaults = ResolverConfig::default();
        Ok(Self {
            url,
            resolver: ResolverConfig {
                file_scheme: args.file_scheme.unwrap_or(defaults.file_scheme),
                archive_scheme: args.archive_scheme.unwrap_or(defaults.archive_scheme),
                archive_name: args.archive_name.unwrap_or(defaults.archive_name),
                archive_path: args.archive,
                base_dir: args.base_dir,
            },
        })
    }
}

pub(crate) fn run_resolve(args: ResolveArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ResolveConfig::try_from(merged)?;
    let response = resolve_once(&config)?;
    write_summary(writer, &response)
}

pub(crate) fn resolve_once(config: &ResolveConfig) -> Result<ResourceResponse, CliError> {
    let resolver = ProtocolResolver::from_config(&config.resolver)?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(resolver.resolve(&config.url)))
}

pub(crate) fn write_summary(
    writer: &mut dyn Write,
    response: &ResourceResponse,
) -> Result<(), CliError> {
    writeln!(writer, "status: {}", response.status).map_err(CliError::stdout)?;
    for (name, value) in &response.headers {
        writeln!(writer, "{name}: {value}").map_err(CliError::stdout)?;
    }
    writeln!(writer, "body: {} bytes", response.body.len()).map_err(CliError::stdout)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ResolveConfig, CliError> {
    let merged = ResolveArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ResolveConfig::try_from(merged)
}
