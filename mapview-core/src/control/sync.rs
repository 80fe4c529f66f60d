//! Keeps map layers in step with the store.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use log::debug;

use super::{MapControl, MapSurface, SharedSurface, TileLayerSpec};
use crate::{EventKind, OverlayChangeSet, OverlayRecord, SharedStore, StoreEvent, Subscription};

#[expect(clippy::float_arithmetic, reason = "percentage to fraction")]
fn opacity_fraction(percent: f64) -> f64 {
    percent / 100.0
}

fn layer_spec(prefix: &str, overlay: &OverlayRecord) -> TileLayerSpec {
    TileLayerSpec {
        id: overlay.id.clone(),
        tiles_url: format!("{prefix}{}", overlay.url),
        opacity: opacity_fraction(overlay.opacity),
        visible: overlay.visible,
    }
}

fn apply_update(
    surface: &mut dyn MapSurface,
    prefix: &str,
    overlay: &OverlayRecord,
    changes: &OverlayChangeSet,
) {
    if changes.is_empty() {
        return;
    }
    if changes.url.is_some() {
        // Tile sources cannot be repointed in place.
        surface.remove_tile_layer(&overlay.id);
        surface.add_tile_layer(layer_spec(prefix, overlay));
        return;
    }
    if let Some(opacity) = changes.opacity {
        surface.set_layer_opacity(&overlay.id, opacity_fraction(opacity));
    }
    if let Some(visible) = changes.visible {
        surface.set_layer_visibility(&overlay.id, visible);
    }
}

/// Non-visual control mirroring every overlay as a tile layer.
///
/// `url_prefix` is prepended to each overlay URL, typically a virtual
/// scheme such as `mapview-file://`.
pub struct LayerSync {
    store: SharedStore,
    url_prefix: String,
    host: Option<SharedSurface>,
    mirrored: Rc<RefCell<BTreeSet<String>>>,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for LayerSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerSync")
            .field("url_prefix", &self.url_prefix)
            .field("attached", &self.host.is_some())
            .field("mirrored", &self.mirrored.borrow())
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl LayerSync {
    /// Create a detached synchroniser.
    #[must_use]
    pub fn new(store: SharedStore, url_prefix: impl Into<String>) -> Self {
        Self {
            store,
            url_prefix: url_prefix.into(),
            host: None,
            mirrored: Rc::default(),
            subscriptions: Vec::new(),
        }
    }

    /// Ids of the layers placed on the host, in id order.
    #[must_use]
    pub fn mirrored(&self) -> Vec<String> {
        self.mirrored.borrow().iter().cloned().collect()
    }

    fn watch_added(&self, host: &SharedSurface) -> Subscription {
        let surface = Rc::clone(host);
        let mirrored = Rc::clone(&self.mirrored);
        let prefix = self.url_prefix.clone();
        self.store
            .subscribe(EventKind::OverlayAdded, move |event: &StoreEvent| {
                if let Some(overlay) = event.overlay() {
                    surface
                        .borrow_mut()
                        .add_tile_layer(layer_spec(&prefix, overlay));
                    mirrored.borrow_mut().insert(overlay.id.clone());
                }
                Ok(())
            })
    }

    fn watch_updated(&self, host: &SharedSurface) -> Subscription {
        let surface = Rc::clone(host);
        let prefix = self.url_prefix.clone();
        self.store
            .subscribe(EventKind::OverlayUpdated, move |event: &StoreEvent| {
                if let StoreEvent::OverlayUpdated { overlay, changes } = event {
                    debug!("syncing layer {} ({:?})", overlay.id, changes.fields());
                    apply_update(&mut *surface.borrow_mut(), &prefix, overlay, changes);
                }
                Ok(())
            })
    }
}

impl MapControl for LayerSync {
    /// Number of layers placed on the host at attach time.
    type Handle = usize;

    fn attach(&mut self, host: SharedSurface) -> usize {
        self.detach();
        let overlays = self.store.list();
        {
            let mut surface = host.borrow_mut();
            let mut mirrored = self.mirrored.borrow_mut();
            for overlay in &overlays {
                surface.add_tile_layer(layer_spec(&self.url_prefix, overlay));
                mirrored.insert(overlay.id.clone());
            }
        }
        let added = self.watch_added(&host);
        let updated = self.watch_updated(&host);
        self.subscriptions.extend([added, updated]);
        self.host = Some(host);
        overlays.len()
    }

    fn detach(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
        let ids = std::mem::take(&mut *self.mirrored.borrow_mut());
        if let Some(host) = self.host.take() {
            let mut surface = host.borrow_mut();
            for id in &ids {
                surface.remove_tile_layer(id);
            }
        }
    }
}
