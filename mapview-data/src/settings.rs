//! Reading and writing the viewer's JSON configuration file.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use mapview_core::ConfigDocument;
use thiserror::Error;

/// File name used when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Error raised while loading or saving a configuration file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        /// Configuration file location.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid configuration document.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        /// Configuration file location.
        path: Utf8PathBuf,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The document could not be encoded.
    #[error("failed to encode configuration for {path}: {source}")]
    Encode {
        /// Configuration file location.
        path: Utf8PathBuf,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The file could not be written.
    #[error("failed to write configuration at {path}: {source}")]
    Write {
        /// Configuration file location.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Load the configuration document at `path`.
///
/// # Errors
///
/// Returns [`SettingsError::Read`] when the file cannot be read and
/// [`SettingsError::Parse`] when it is not a configuration document.
pub fn load(path: &Utf8Path) -> Result<ConfigDocument, SettingsError> {
    let contents = mapview_fs::read_utf8_file(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loaded configuration from {path}");
    Ok(document)
}

/// Load the configuration at `path`, falling back to defaults when the file
/// does not exist or cannot be used.
///
/// A missing file is silent; any other failure is logged.
#[must_use]
pub fn load_or_default(path: &Utf8Path) -> ConfigDocument {
    match mapview_fs::file_is_file(path) {
        Ok(true) => {}
        Ok(false) => return ConfigDocument::default(),
        Err(error) => {
            warn!("cannot inspect configuration at {path}: {error}");
            return ConfigDocument::default();
        }
    }
    load(path).unwrap_or_else(|error| {
        warn!("{error}; using the default configuration");
        ConfigDocument::default()
    })
}

/// Write `document` to `path` as pretty-printed JSON, creating missing
/// parent directories.
///
/// # Errors
///
/// Returns [`SettingsError::Encode`] or [`SettingsError::Write`].
pub fn save(path: &Utf8Path, document: &ConfigDocument) -> Result<(), SettingsError> {
    let mut contents =
        serde_json::to_string_pretty(document).map_err(|source| SettingsError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    contents.push('\n');
    mapview_fs::write_utf8_file(path, &contents).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("saved configuration to {path}");
    Ok(())
}
