//! Map controls and the host map surface they drive.
//!
//! A control is attached to a [`MapSurface`] and returns a handle describing
//! what it renders. Widget construction stays with the host; controls own
//! only their state and their store subscriptions, which they release on
//! [`MapControl::detach`].

use std::cell::RefCell;
use std::rc::Rc;

mod layers;
mod settings;
mod sync;

pub use layers::{LayerToggle, LayersControl, LayersError, LayersView};
pub use settings::{FormError, NEW_OVERLAY_NAME, OverlayForm, SettingsControl, SettingsView};
pub use sync::LayerSync;

/// A raster tile layer as understood by the host map.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerSpec {
    /// Layer and source identifier; equal to the overlay id.
    pub id: String,
    /// Tile URL template handed to the map library.
    pub tiles_url: String,
    /// Opacity as a fraction in `[0, 1]`.
    pub opacity: f64,
    /// Whether the layer is drawn.
    pub visible: bool,
}

/// Operations a control may perform on the host map.
pub trait MapSurface {
    /// Add a layer, replacing any existing layer with the same id.
    fn add_tile_layer(&mut self, layer: TileLayerSpec);

    /// Remove a layer and its source. Returns `false` if it was absent.
    fn remove_tile_layer(&mut self, id: &str) -> bool;

    /// Show or hide a layer; absent layers are ignored.
    fn set_layer_visibility(&mut self, id: &str, visible: bool);

    /// Set a layer's opacity as a fraction; absent layers are ignored.
    fn set_layer_opacity(&mut self, id: &str, opacity: f64);

    /// Visibility of a layer, or `None` if the surface has no such layer.
    fn layer_visibility(&self, id: &str) -> Option<bool>;
}

/// Shared, mutable handle to the host map.
pub type SharedSurface = Rc<RefCell<dyn MapSurface>>;

/// Lifecycle shared by every control placed on the map.
pub trait MapControl {
    /// What the host renders for this control.
    type Handle;

    /// Bind the control to `host` and start reacting to store events.
    fn attach(&mut self, host: SharedSurface) -> Self::Handle;

    /// Release subscriptions and any state placed on the host.
    fn detach(&mut self);
}
