//! Resolver configuration.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Default scheme for local files.
pub const DEFAULT_FILE_SCHEME: &str = "mapview-file";
/// Default scheme for tile archive and base-directory requests.
pub const DEFAULT_ARCHIVE_SCHEME: &str = "mapview-tiles";
/// Default reserved name that routes requests to the tile archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "tiles.mbtiles";

/// Schemes, archive and base directory served by a
/// [`ProtocolResolver`](super::ProtocolResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Scheme mapped onto the local filesystem.
    pub file_scheme: String,
    /// Scheme serving tiles and base-directory resources.
    pub archive_scheme: String,
    /// Archive-scheme name answered from the tile archive.
    pub archive_name: String,
    /// MBTiles archive to open at startup.
    pub archive_path: Option<Utf8PathBuf>,
    /// Directory serving every other archive-scheme name.
    pub base_dir: Option<Utf8PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            file_scheme: DEFAULT_FILE_SCHEME.to_owned(),
            archive_scheme: DEFAULT_ARCHIVE_SCHEME.to_owned(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_owned(),
            archive_path: None,
            base_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn missing_fields_take_defaults() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"base_dir": "/srv/map"}"#).expect("decode");
        assert_eq!(config.file_scheme, DEFAULT_FILE_SCHEME);
        assert_eq!(config.archive_name, DEFAULT_ARCHIVE_NAME);
        assert_eq!(config.base_dir, Some(Utf8PathBuf::from("/srv/map")));
        assert_eq!(config.archive_path, None);
    }
}
