//! Test doubles shared by unit and behaviour tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{EventKind, MapSurface, OverlayStore, StoreEvent, Subscription, TileLayerSpec};

/// A call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    /// `add_tile_layer` with the layer id.
    Add(String),
    /// `remove_tile_layer` with the layer id.
    Remove(String),
    /// `set_layer_visibility`.
    Visibility(String, bool),
    /// `set_layer_opacity`.
    Opacity(String, f64),
}

/// In-memory [`MapSurface`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    /// Layers currently on the surface.
    pub layers: BTreeMap<String, TileLayerSpec>,
    /// Calls in the order they were made.
    pub calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    /// Layer with the given id.
    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&TileLayerSpec> {
        self.layers.get(id)
    }
}

impl MapSurface for RecordingSurface {
    fn add_tile_layer(&mut self, layer: TileLayerSpec) {
        self.calls.push(SurfaceCall::Add(layer.id.clone()));
        self.layers.insert(layer.id.clone(), layer);
    }

    fn remove_tile_layer(&mut self, id: &str) -> bool {
        self.calls.push(SurfaceCall::Remove(id.to_owned()));
        self.layers.remove(id).is_some()
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) {
        self.calls
            .push(SurfaceCall::Visibility(id.to_owned(), visible));
        if let Some(layer) = self.layers.get_mut(id) {
            layer.visible = visible;
        }
    }

    fn set_layer_opacity(&mut self, id: &str, opacity: f64) {
        self.calls.push(SurfaceCall::Opacity(id.to_owned(), opacity));
        if let Some(layer) = self.layers.get_mut(id) {
            layer.opacity = opacity;
        }
    }

    fn layer_visibility(&self, id: &str) -> Option<bool> {
        self.layers.get(id).map(|layer| layer.visible)
    }
}

/// Events captured by [`record_events`].
pub type EventLog = Rc<RefCell<Vec<StoreEvent>>>;

/// Subscribe to `kind` and collect every delivered event.
pub fn record_events(store: &OverlayStore, kind: EventKind) -> (EventLog, Subscription) {
    let log: EventLog = Rc::default();
    let sink = Rc::clone(&log);
    let subscription = store.subscribe(kind, move |event: &StoreEvent| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    (log, subscription)
}

/// Subscribe to updates of overlay `id` and collect every delivered event.
pub fn record_overlay_events(store: &OverlayStore, id: &str) -> (EventLog, Subscription) {
    let log: EventLog = Rc::default();
    let sink = Rc::clone(&log);
    let subscription = store.subscribe_overlay(id, move |event: &StoreEvent| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    (log, subscription)
}
