//! Facade crate for the map viewer engine.
//!
//! This crate re-exports the overlay store, event bus and map controls, and
//! exposes the tile archive, protocol resolver and backend channel behind the
//! `archive` feature flag.

#![forbid(unsafe_code)]

pub use mapview_core::{
    EventBus, EventKind, GeoReferencedObject, LayerSync, LayersControl, MapControl, MapGroup,
    MapSurface, NamedGeoReferencedObject, OverlayChangeSet, OverlayField, OverlayForm,
    OverlayRecord, OverlayStore, SettingsControl, SharedStore, StoreError, StoreEvent,
    Subscription, TileCoordinate, TileCoordinateError, TileLayerSpec,
};

#[cfg(feature = "serde")]
pub use mapview_core::{ConfigBridge, ConfigDocument, MapType, PersistedMap, Viewport};

#[cfg(feature = "archive")]
pub use mapview_data::{
    ArchiveSlot, Backend, BackendMessage, OverlaySource, ProtocolResolver, ResolverConfig,
    ResourceRequest, ResourceResponse, SchemeHandler, TileArchive, UiRequest,
};
