//! Lifecycle holder for the archive the resolver serves from.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, warn};
use mapview_core::TileCoordinate;
use thiserror::Error;

use super::{ArchiveError, TileArchive};

/// Why an [`ArchiveSlot`] cannot serve tiles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArchiveStateError {
    /// No archive has been configured yet.
    #[error("no tile archive has been opened")]
    Unopened,
    /// The last open attempt failed.
    #[error("tile archive at {path} failed to open: {reason}")]
    Failed {
        /// Archive that failed to open.
        path: PathBuf,
        /// Rendered open error.
        reason: String,
    },
}

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Unopened,
    Ready(Arc<TileArchive>),
    Failed {
        path: PathBuf,
        reason: String,
    },
}

/// Shared slot holding at most one open archive.
///
/// A failed open is remembered: later lookups report not-found instead of
/// retrying until [`ArchiveSlot::replace`] is called again.
#[derive(Debug, Default)]
pub struct ArchiveSlot {
    state: RwLock<SlotState>,
}

impl ArchiveSlot {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot populated by opening `path`.
    #[must_use]
    pub fn opened(path: impl AsRef<Path>) -> Self {
        let slot = Self::new();
        // The outcome is recorded in the slot itself.
        if let Err(error) = slot.replace(path) {
            debug!("archive slot starts failed: {error}");
        }
        slot
    }

    /// Close any current archive and open the one at `path`.
    ///
    /// The previous archive is released once in-flight readers drop their
    /// handles.
    ///
    /// # Errors
    ///
    /// Returns the open error after recording the slot as failed.
    pub fn replace(&self, path: impl AsRef<Path>) -> Result<Arc<TileArchive>, ArchiveError> {
        let archive_path = path.as_ref();
        let (next, outcome) = match TileArchive::open(archive_path) {
            Ok(archive) => {
                let shared = Arc::new(archive);
                info!(
                    "serving {} tiles from {}",
                    shared.len(),
                    archive_path.display()
                );
                (SlotState::Ready(Arc::clone(&shared)), Ok(shared))
            }
            Err(error) => {
                warn!("tile archive unavailable: {error}");
                (
                    SlotState::Failed {
                        path: archive_path.to_path_buf(),
                        reason: error.to_string(),
                    },
                    Err(error),
                )
            }
        };
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
        outcome
    }

    /// Return the slot to its unopened state.
    pub fn close(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SlotState::Unopened;
    }

    /// The open archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveStateError`] describing why no archive is available.
    pub fn ready(&self) -> Result<Arc<TileArchive>, ArchiveStateError> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Ready(archive) => Ok(Arc::clone(archive)),
            SlotState::Unopened => Err(ArchiveStateError::Unopened),
            SlotState::Failed { path, reason } => Err(ArchiveStateError::Failed {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Whether an archive is open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready().is_ok()
    }

    /// Decompressed payload for `tile`; `Ok(None)` when the slot is not
    /// ready or the tile is absent.
    ///
    /// # Errors
    ///
    /// Propagates read and decompression failures from the open archive.
    pub fn tile(&self, tile: TileCoordinate) -> Result<Option<Vec<u8>>, ArchiveError> {
        match self.ready() {
            Ok(archive) => archive.tile(tile),
            Err(_) => Ok(None),
        }
    }
}
