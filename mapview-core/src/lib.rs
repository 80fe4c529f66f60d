//! Overlay state management for the map viewer.
//!
//! The [`OverlayStore`] is the single source of truth for overlay
//! definitions. It computes a field-level [`OverlayChangeSet`] on every
//! update and announces changes through a synchronous [`EventBus`], which
//! map controls and persistence subscribe to instead of calling each other.
//!
//! ```
//! use mapview_core::{EventKind, OverlayRecord, OverlayStore};
//!
//! # fn main() -> Result<(), mapview_core::StoreError> {
//! let store = OverlayStore::shared();
//! let _sub = store.subscribe(EventKind::OverlayAdded, |event| {
//!     assert_eq!(event.overlay().map(|o| o.name.as_str()), Some("Roads"));
//!     Ok(())
//! });
//! store.upsert("o1", OverlayRecord::new("o1", "Roads", "/tiles/roads"))?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod bus;
pub mod control;
mod entity;
mod event;
mod overlay;
#[cfg(feature = "serde")]
mod persist;
mod store;
mod tile;

pub use bus::{EventBus, HandlerError, HandlerResult, PublishReport, Subscription};
pub use control::{
    FormError, LayerSync, LayerToggle, LayersControl, LayersError, LayersView, MapControl,
    MapSurface, OverlayForm, SettingsControl, SettingsView, SharedSurface, TileLayerSpec,
};
pub use entity::{GeoReferencedObject, MapGroup, NamedGeoReferencedObject};
pub use event::{EventKind, StoreEvent};
pub use overlay::{DEFAULT_OPACITY, OPACITY_RANGE, OverlayChangeSet, OverlayField, OverlayRecord};
#[cfg(feature = "serde")]
pub use persist::{
    ApplyReport, ConfigBridge, ConfigDocument, DEFAULT_CENTER, DEFAULT_ZOOM, MapType,
    PersistedMap, Viewport,
};
pub use store::{OverlayStore, SharedStore, StoreError, UpsertOutcome};
pub use tile::{MAX_ZOOM, TileCoordinate, TileCoordinateError};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
