//! The overlay store: single source of truth for overlay definitions.
//!
//! One store exists per running application. It is constructed explicitly
//! and shared as a [`SharedStore`] with every component that reads or
//! mutates overlays; nothing reaches it through global state.
//!
//! All mutation goes through the store's methods. Reads hand out owned
//! copies, so editing a returned record never bypasses change detection.
//! Events are published after the internal state has been updated and all
//! internal borrows released, which lets handlers read from or write back to
//! the store while being notified.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::{
    EventBus, EventKind, HandlerResult, MapGroup, NamedGeoReferencedObject, OverlayChangeSet,
    OverlayRecord, StoreEvent, Subscription,
};

/// Reference-counted handle through which components share one store.
pub type SharedStore = Rc<OverlayStore>;

/// Errors raised when a caller violates the store's preconditions.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// The supplied identifier was empty or whitespace.
    #[error("identifier must not be empty")]
    EmptyId,
    /// The record's own id disagrees with the key it was stored under.
    #[error("record id {record:?} does not match key {key:?}")]
    IdMismatch {
        /// Key passed to the store.
        key: String,
        /// Identifier carried by the record.
        record: String,
    },
    /// Opacity was not a finite percentage in `[0, 100]`.
    #[error("opacity {opacity} for overlay {id:?} is outside 0..=100")]
    InvalidOpacity {
        /// Offending overlay.
        id: String,
        /// Rejected value.
        opacity: f64,
    },
}

/// Result of a successful [`OverlayStore::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// The overlay was new.
    Added,
    /// The overlay replaced an existing record; may be empty.
    Updated(OverlayChangeSet),
}

#[derive(Debug, Default)]
struct StoreState {
    overlays: IndexMap<String, OverlayRecord>,
    groups: IndexMap<String, MapGroup>,
    locations: IndexMap<String, NamedGeoReferencedObject>,
    style: Option<OverlayRecord>,
}

/// In-memory table of overlays, groups, locations and the base map style.
///
/// # Examples
///
/// ```
/// use mapview_core::{OverlayRecord, OverlayStore, UpsertOutcome};
///
/// # fn main() -> Result<(), mapview_core::StoreError> {
/// let store = OverlayStore::shared();
/// let roads = OverlayRecord::new("o1", "Roads", "a");
/// assert_eq!(store.upsert("o1", roads.clone())?, UpsertOutcome::Added);
///
/// let outcome = store.upsert("o1", roads.with_opacity(50.0))?;
/// assert!(matches!(
///     outcome,
///     UpsertOutcome::Updated(ref changes) if changes.opacity == Some(50.0)
/// ));
/// assert_eq!(store.get("o1").map(|o| o.opacity), Some(50.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct OverlayStore {
    state: RefCell<StoreState>,
    topics: EventBus<EventKind, StoreEvent>,
    overlay_topics: EventBus<String, StoreEvent>,
}

fn require_id(id: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() {
        Err(StoreError::EmptyId)
    } else {
        Ok(())
    }
}

fn require_matching_id(key: &str, record: &str) -> Result<(), StoreError> {
    require_id(key)?;
    if key == record {
        Ok(())
    } else {
        Err(StoreError::IdMismatch {
            key: key.to_owned(),
            record: record.to_owned(),
        })
    }
}

impl OverlayStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store ready to be shared between components.
    #[must_use]
    pub fn shared() -> SharedStore {
        Rc::new(Self::new())
    }

    /// Insert a new overlay or replace an existing one.
    ///
    /// A new id publishes [`StoreEvent::OverlayAdded`]. An existing id
    /// publishes [`StoreEvent::OverlayUpdated`] to broadcast subscribers and
    /// then to subscribers of that overlay, both carrying the same change
    /// set. The update events fire even when nothing changed.
    ///
    /// # Errors
    ///
    /// Rejects empty ids, records whose `id` differs from `id`, and opacity
    /// outside `[0, 100]`. Rejected calls leave the store untouched and
    /// publish nothing.
    pub fn upsert(&self, id: &str, incoming: OverlayRecord) -> Result<UpsertOutcome, StoreError> {
        require_matching_id(id, &incoming.id)?;
        if !incoming.has_valid_opacity() {
            return Err(StoreError::InvalidOpacity {
                id: id.to_owned(),
                opacity: incoming.opacity,
            });
        }

        let replaced = self
            .state
            .borrow_mut()
            .overlays
            .insert(id.to_owned(), incoming.clone());

        let Some(previous) = replaced else {
            self.topics
                .publish(&EventKind::OverlayAdded, &StoreEvent::OverlayAdded(incoming));
            return Ok(UpsertOutcome::Added);
        };

        let changes = previous.diff(&incoming);
        debug!("overlay {id} updated; changed fields: {:?}", changes.fields());
        let event = StoreEvent::OverlayUpdated {
            overlay: incoming,
            changes: changes.clone(),
        };
        self.topics.publish(&EventKind::OverlayUpdated, &event);
        self.overlay_topics.publish(&id.to_owned(), &event);
        Ok(UpsertOutcome::Updated(changes))
    }

    /// Copy of the overlay stored under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<OverlayRecord> {
        self.state.borrow().overlays.get(id).cloned()
    }

    /// Whether an overlay is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.state.borrow().overlays.contains_key(id)
    }

    /// Copies of every stored overlay, in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<OverlayRecord> {
        self.state.borrow().overlays.values().cloned().collect()
    }

    /// Number of stored overlays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    /// Whether no overlays are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().overlays.is_empty()
    }

    /// Insert or overwrite a map group and publish
    /// [`StoreEvent::MapGroupsUpdated`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyId`] when the group has no id.
    pub fn add_group(&self, group: MapGroup) -> Result<(), StoreError> {
        require_id(&group.id)?;
        self.state
            .borrow_mut()
            .groups
            .insert(group.id.clone(), group.clone());
        self.topics.publish(
            &EventKind::MapGroupsUpdated,
            &StoreEvent::MapGroupsUpdated(group),
        );
        Ok(())
    }

    /// Copies of every group, in insertion order.
    #[must_use]
    pub fn list_groups(&self) -> Vec<MapGroup> {
        self.state.borrow().groups.values().cloned().collect()
    }

    /// Copy of the group stored under `id`; dangling references yield `None`.
    #[must_use]
    pub fn group(&self, id: &str) -> Option<MapGroup> {
        self.state.borrow().groups.get(id).cloned()
    }

    /// Replace the base map style and publish [`StoreEvent::MapStyleUpdated`].
    pub fn set_map_style(&self, style: OverlayRecord) {
        self.state.borrow_mut().style = Some(style.clone());
        self.topics.publish(
            &EventKind::MapStyleUpdated,
            &StoreEvent::MapStyleUpdated(style),
        );
    }

    /// Copy of the current base map style.
    #[must_use]
    pub fn map_style(&self) -> Option<OverlayRecord> {
        self.state.borrow().style.clone()
    }

    /// Insert or overwrite a named location and publish
    /// [`StoreEvent::MapLocationsUpdated`].
    ///
    /// # Errors
    ///
    /// Rejects empty ids and locations whose own id differs from `id`.
    pub fn add_map_location(
        &self,
        id: &str,
        location: NamedGeoReferencedObject,
    ) -> Result<(), StoreError> {
        require_matching_id(id, location.id())?;
        self.state
            .borrow_mut()
            .locations
            .insert(id.to_owned(), location.clone());
        self.topics.publish(
            &EventKind::MapLocationsUpdated,
            &StoreEvent::MapLocationsUpdated(vec![location]),
        );
        Ok(())
    }

    /// Copies of every named location, in insertion order.
    #[must_use]
    pub fn map_locations(&self) -> Vec<NamedGeoReferencedObject> {
        self.state.borrow().locations.values().cloned().collect()
    }

    /// Subscribe to every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&StoreEvent) -> HandlerResult + 'static,
    {
        self.topics.subscribe(kind, handler)
    }

    /// Subscribe to updates of the overlay stored under `id`.
    ///
    /// Only [`StoreEvent::OverlayUpdated`] is delivered here; the id does
    /// not need to exist yet.
    pub fn subscribe_overlay<F>(&self, id: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&StoreEvent) -> HandlerResult + 'static,
    {
        self.overlay_topics.subscribe(id.into(), handler)
    }
}
