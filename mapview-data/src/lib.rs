//! Storage and I/O for the map viewer.
//!
//! This crate holds everything that touches the disk or an executor:
//!
//! - [`archive`] reads MBTiles tile archives and keeps the served archive
//!   in an [`archive::ArchiveSlot`].
//! - [`protocol`] answers the viewer's custom URL schemes from local files,
//!   a base directory and the tile archive.
//! - [`settings`] loads and saves the JSON configuration document.
//! - [`overlays`] discovers loose-tile overlay directories.
//! - [`ipc`] drives the request/reply channel between UI and backend.
#![forbid(unsafe_code)]

pub mod archive;
pub mod ipc;
pub mod overlays;
pub mod protocol;
pub mod settings;

pub use archive::{
    ArchiveError, ArchiveIndexEntry, ArchiveMetadata, ArchiveSlot, ArchiveStateError,
    TileArchive, TileScheme,
};
pub use ipc::{Backend, BackendError, BackendMessage, UiRequest};
pub use overlays::{DiscoveryError, OverlaySource};
pub use protocol::{
    ProtocolResolver, ResolverBuildError, ResolverConfig, ResourceRequest, ResourceResponse,
    SchemeHandler,
};
pub use settings::SettingsError;
