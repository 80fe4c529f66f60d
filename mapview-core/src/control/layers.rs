//! Checkbox panel listing every overlay.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use super::{MapControl, MapSurface, SharedSurface};
use crate::{
    EventKind, OverlayRecord, OverlayStore, SharedStore, StoreError, StoreEvent, Subscription,
    UpsertOutcome,
};

/// One checkbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerToggle {
    /// Overlay id.
    pub id: String,
    /// Label shown next to the checkbox.
    pub label: String,
    /// Whether the checkbox is ticked.
    pub checked: bool,
}

/// Snapshot of the panel handed to the host for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayersView {
    /// Rows in display order.
    pub rows: Vec<LayerToggle>,
    /// Whether the panel is expanded.
    pub open: bool,
}

/// Errors raised while restoring the active overlay list.
#[derive(Debug, Error)]
pub enum LayersError {
    /// The persisted list could not be parsed.
    #[cfg(feature = "serde")]
    #[error("invalid active overlay list: {0}")]
    Decode(#[from] serde_json::Error),
    /// The store rejected a visibility change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default)]
struct Panel {
    rows: Vec<LayerToggle>,
    active: BTreeSet<String>,
    open: bool,
}

impl Panel {
    fn push_row(&mut self, overlay: &OverlayRecord) -> bool {
        if self.rows.iter().any(|row| row.id == overlay.id) {
            return false;
        }
        self.rows.push(LayerToggle {
            id: overlay.id.clone(),
            label: overlay.name.clone(),
            checked: overlay.visible,
        });
        self.mark(&overlay.id, overlay.visible);
        true
    }

    fn apply_update(&mut self, overlay: &OverlayRecord) {
        let Some(row) = self.rows.iter_mut().find(|row| row.id == overlay.id) else {
            return;
        };
        row.label.clone_from(&overlay.name);
        row.checked = overlay.visible;
        self.mark(&overlay.id, overlay.visible);
    }

    fn sync_with(&mut self, surface: &dyn MapSurface) {
        for row in &mut self.rows {
            if let Some(visible) = surface.layer_visibility(&row.id) {
                row.checked = visible;
            }
        }
        self.active = self
            .rows
            .iter()
            .filter(|row| row.checked)
            .map(|row| row.id.clone())
            .collect();
    }

    fn mark(&mut self, id: &str, active: bool) {
        if active {
            self.active.insert(id.to_owned());
        } else {
            self.active.remove(id);
        }
    }

    fn view(&self) -> LayersView {
        LayersView {
            rows: self.rows.clone(),
            open: self.open,
        }
    }
}

/// Lists overlays as toggles and writes visibility changes to the store.
///
/// Rows follow the store: new overlays gain a row, and updates to an
/// overlay refresh its label and checkbox.
#[derive(Debug)]
pub struct LayersControl {
    store: SharedStore,
    panel: Rc<RefCell<Panel>>,
    subscriptions: Vec<Subscription>,
    row_subscriptions: Rc<RefCell<Vec<Subscription>>>,
}

fn watch_row(store: &OverlayStore, id: &str, panel: &Rc<RefCell<Panel>>) -> Subscription {
    let sink = Rc::clone(panel);
    store.subscribe_overlay(id, move |event: &StoreEvent| {
        if let Some(overlay) = event.overlay() {
            sink.borrow_mut().apply_update(overlay);
        }
        Ok(())
    })
}

impl LayersControl {
    /// Create a detached control over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            panel: Rc::default(),
            subscriptions: Vec::new(),
            row_subscriptions: Rc::default(),
        }
    }

    /// Current rows and panel state.
    #[must_use]
    pub fn view(&self) -> LayersView {
        self.panel.borrow().view()
    }

    /// Whether the panel is expanded.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.panel.borrow().open
    }

    /// Expand the panel.
    pub fn open(&self) {
        self.panel.borrow_mut().open = true;
    }

    /// Collapse the panel.
    pub fn close(&self) {
        self.panel.borrow_mut().open = false;
    }

    /// Flip between expanded and collapsed.
    pub fn toggle_open(&self) {
        let mut panel = self.panel.borrow_mut();
        panel.open = !panel.open;
    }

    /// Ids of overlays currently shown, in id order.
    #[must_use]
    pub fn active_overlays(&self) -> Vec<String> {
        self.panel.borrow().active.iter().cloned().collect()
    }

    /// Apply a checkbox change by upserting the overlay with `visible`
    /// replaced.
    ///
    /// Returns `Ok(None)` when the store no longer knows the overlay.
    ///
    /// # Errors
    ///
    /// Propagates [`StoreError`] from the upsert.
    pub fn toggle(&self, id: &str, checked: bool) -> Result<Option<UpsertOutcome>, StoreError> {
        let Some(current) = self.store.get(id) else {
            debug!("toggle for unknown overlay {id}");
            return Ok(None);
        };
        self.store.upsert(id, current.with_visible(checked)).map(Some)
    }

    /// Serialise the active overlay ids as a JSON string array.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error, which does not occur for string arrays.
    #[cfg(feature = "serde")]
    pub fn export_active(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.active_overlays())
    }

    /// Make exactly the overlays listed in `json` visible.
    ///
    /// Every row is toggled through the store, so map layers follow. Returns
    /// the number of rows that were toggled on.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or when the store rejects an update.
    #[cfg(feature = "serde")]
    pub fn restore_active(&self, json: &str) -> Result<usize, LayersError> {
        let wanted: BTreeSet<String> = serde_json::from_str(json)?;
        let ids: Vec<String> = self
            .panel
            .borrow()
            .rows
            .iter()
            .map(|row| row.id.clone())
            .collect();
        let mut enabled = 0;
        for id in ids {
            let on = wanted.contains(&id);
            self.toggle(&id, on)?;
            if on {
                enabled += 1;
            }
        }
        Ok(enabled)
    }

    fn watch_added(&self) -> Subscription {
        let weak_store = Rc::downgrade(&self.store);
        let sink = Rc::clone(&self.panel);
        let rows = Rc::clone(&self.row_subscriptions);
        self.store
            .subscribe(EventKind::OverlayAdded, move |event: &StoreEvent| {
                let Some(overlay) = event.overlay() else {
                    return Ok(());
                };
                if !sink.borrow_mut().push_row(overlay) {
                    debug!("overlay {} already listed", overlay.id);
                    return Ok(());
                }
                if let Some(store) = weak_store.upgrade() {
                    rows.borrow_mut()
                        .push(watch_row(&store, &overlay.id, &sink));
                }
                Ok(())
            })
    }
}

impl MapControl for LayersControl {
    type Handle = LayersView;

    fn attach(&mut self, host: SharedSurface) -> LayersView {
        self.detach();
        let overlays = self.store.list();
        {
            let mut panel = self.panel.borrow_mut();
            panel.rows.clear();
            for overlay in &overlays {
                panel.push_row(overlay);
            }
            panel.sync_with(&*host.borrow());
        }
        let watchers: Vec<Subscription> = overlays
            .iter()
            .map(|overlay| watch_row(&self.store, &overlay.id, &self.panel))
            .collect();
        self.row_subscriptions.borrow_mut().extend(watchers);
        let added = self.watch_added();
        self.subscriptions.push(added);
        self.view()
    }

    fn detach(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
        let rows: Vec<Subscription> = self.row_subscriptions.borrow_mut().drain(..).collect();
        for subscription in rows {
            subscription.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TileLayerSpec;
    use crate::test_support::RecordingSurface;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> SharedStore {
        let store = OverlayStore::shared();
        store
            .upsert("o1", OverlayRecord::new("o1", "Roads", "a"))
            .expect("seed overlay");
        store
            .upsert(
                "o2",
                OverlayRecord::new("o2", "Rivers", "b").with_visible(false),
            )
            .expect("seed overlay");
        store
    }

    fn attached(store: &SharedStore) -> (LayersControl, Rc<RefCell<RecordingSurface>>) {
        let surface = Rc::new(RefCell::new(RecordingSurface::default()));
        let mut control = LayersControl::new(Rc::clone(store));
        control.attach(surface.clone());
        (control, surface)
    }

    #[rstest]
    fn attach_lists_existing_overlays(store: SharedStore) {
        let (control, _surface) = attached(&store);
        let view = control.view();
        let labels: Vec<(&str, bool)> = view
            .rows
            .iter()
            .map(|row| (row.label.as_str(), row.checked))
            .collect();
        assert_eq!(labels, vec![("Roads", true), ("Rivers", false)]);
        assert_eq!(control.active_overlays(), vec!["o1"]);
    }

    #[rstest]
    fn surface_visibility_wins_at_attach(store: SharedStore) {
        let surface = Rc::new(RefCell::new(RecordingSurface::default()));
        surface.borrow_mut().add_tile_layer(TileLayerSpec {
            id: "o2".into(),
            tiles_url: "b".into(),
            opacity: 1.0,
            visible: true,
        });
        let mut control = LayersControl::new(Rc::clone(&store));
        let view = control.attach(surface);
        assert!(view.rows.iter().all(|row| row.checked));
        assert_eq!(control.active_overlays(), vec!["o1", "o2"]);
    }

    #[rstest]
    fn new_overlays_gain_a_row_once(store: SharedStore) {
        let (control, _surface) = attached(&store);
        store
            .upsert("o3", OverlayRecord::new("o3", "Trails", "c"))
            .expect("upsert");
        store
            .upsert("o3", OverlayRecord::new("o3", "Paths", "c"))
            .expect("upsert");
        let rows = control.view().rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.last().map(|row| row.label.as_str()), Some("Paths"));
    }

    #[rstest]
    fn toggle_writes_through_store(store: SharedStore) {
        let (control, _surface) = attached(&store);
        let outcome = control.toggle("o1", false).expect("toggle");
        assert!(matches!(outcome, Some(UpsertOutcome::Updated(ref c)) if c.visible == Some(false)));
        assert_eq!(store.get("o1").map(|o| o.visible), Some(false));
        assert!(control.active_overlays().is_empty());
        assert_eq!(control.toggle("missing", true), Ok(None));
    }

    #[rstest]
    fn detach_stops_following_the_store(store: SharedStore) {
        let (mut control, _surface) = attached(&store);
        control.detach();
        store
            .upsert("o1", OverlayRecord::new("o1", "Renamed", "a"))
            .expect("upsert");
        store
            .upsert("o9", OverlayRecord::new("o9", "Late", "z"))
            .expect("upsert");
        let labels: Vec<String> = control.view().rows.into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["Roads", "Rivers"]);
    }

    #[rstest]
    fn panel_opens_and_closes(store: SharedStore) {
        let control = LayersControl::new(store);
        assert!(!control.is_open());
        control.toggle_open();
        assert!(control.is_open());
        control.close();
        assert!(!control.view().open);
        control.open();
        assert!(control.is_open());
    }

    #[rstest]
    fn active_list_round_trips_through_json(store: SharedStore) {
        let (control, _surface) = attached(&store);
        let saved = control.export_active().expect("encode");
        assert_eq!(saved, r#"["o1"]"#);

        let enabled = control.restore_active(r#"["o2"]"#).expect("restore");

        assert_eq!(enabled, 1);
        assert_eq!(control.active_overlays(), vec!["o2"]);
        assert_eq!(store.get("o1").map(|o| o.visible), Some(false));
        assert!(matches!(
            control.restore_active("not json"),
            Err(LayersError::Decode(_))
        ));
    }
}
