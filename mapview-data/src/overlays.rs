//! Discovery of loose-tile overlays on disk.
//!
//! Every non-hidden subdirectory of the configured overlay directory is one
//! overlay whose tiles live at `<dir>/{z}/{x}/{y}.png`.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tile template appended to each overlay directory.
pub const TILE_TEMPLATE: &str = "{z}/{x}/{y}.png";

/// An overlay found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySource {
    /// Directory name, used as the overlay's display name.
    pub name: String,
    /// Tile URL template rooted at the overlay directory.
    pub path: String,
}

/// Error raised while scanning for overlays.
#[derive(Debug, Error)]
#[error("failed to scan overlay directory {path}: {source}")]
pub struct DiscoveryError {
    /// Scanned directory.
    pub path: Utf8PathBuf,
    /// Underlying error.
    #[source]
    pub source: io::Error,
}

/// Overlays below `root`, ordered by name.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when `root` cannot be listed.
pub fn discover(root: &Utf8Path) -> Result<Vec<OverlaySource>, DiscoveryError> {
    let names = mapview_fs::list_subdirectories(root).map_err(|source| DiscoveryError {
        path: root.to_path_buf(),
        source,
    })?;
    let overlays: Vec<OverlaySource> = names
        .into_iter()
        .map(|name| {
            let path = format!("{root}/{name}/{TILE_TEMPLATE}");
            debug!("found overlay directory {root}/{name}");
            OverlaySource { name, path }
        })
        .collect();
    debug!("discovered {} overlays under {root}", overlays.len());
    Ok(overlays)
}

/// Overlays below the configured directory; empty when none is configured
/// or the scan fails.
#[must_use]
pub fn discover_configured(root: Option<&str>) -> Vec<OverlaySource> {
    let Some(dir) = root else {
        warn!("no overlay path configured");
        return Vec::new();
    };
    discover(Utf8Path::new(dir)).unwrap_or_else(|error| {
        warn!("{error}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn lists_visible_directories_in_order() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        for name in ["roads", ".git", "hillshade"] {
            std::fs::create_dir(root.join(name)).expect("mkdir");
        }
        std::fs::write(root.join("readme.txt"), "x").expect("write");

        let overlays = discover(&root).expect("discover");
        assert_eq!(
            overlays,
            vec![
                OverlaySource {
                    name: "hillshade".to_owned(),
                    path: format!("{root}/hillshade/{{z}}/{{x}}/{{y}}.png"),
                },
                OverlaySource {
                    name: "roads".to_owned(),
                    path: format!("{root}/roads/{{z}}/{{x}}/{{y}}.png"),
                },
            ]
        );
    }

    #[rstest]
    fn missing_directory_is_an_error_or_empty() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().join("absent")).expect("utf-8 path");
        assert!(discover(&root).is_err());
        assert!(discover_configured(Some(root.as_str())).is_empty());
        assert!(discover_configured(None).is_empty());
    }
}
