//! Typed notifications emitted by [`crate::OverlayStore`].

use crate::{MapGroup, NamedGeoReferencedObject, OverlayChangeSet, OverlayRecord};

/// Discriminant used to subscribe to a class of [`StoreEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A previously unknown overlay was inserted.
    OverlayAdded,
    /// An existing overlay was replaced.
    OverlayUpdated,
    /// A map group was inserted or overwritten.
    MapGroupsUpdated,
    /// The base map style was replaced.
    MapStyleUpdated,
    /// A named map location was inserted or overwritten.
    MapLocationsUpdated,
}

/// A change published by the store, carrying its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Payload of [`EventKind::OverlayAdded`].
    OverlayAdded(OverlayRecord),
    /// Payload of [`EventKind::OverlayUpdated`].
    OverlayUpdated {
        /// The overlay as stored after the update.
        overlay: OverlayRecord,
        /// Fields that differ from the previous state.
        changes: OverlayChangeSet,
    },
    /// Payload of [`EventKind::MapGroupsUpdated`].
    MapGroupsUpdated(MapGroup),
    /// Payload of [`EventKind::MapStyleUpdated`].
    MapStyleUpdated(OverlayRecord),
    /// Payload of [`EventKind::MapLocationsUpdated`].
    MapLocationsUpdated(Vec<NamedGeoReferencedObject>),
}

impl StoreEvent {
    /// The subscription key this event is published under.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::OverlayAdded(_) => EventKind::OverlayAdded,
            Self::OverlayUpdated { .. } => EventKind::OverlayUpdated,
            Self::MapGroupsUpdated(_) => EventKind::MapGroupsUpdated,
            Self::MapStyleUpdated(_) => EventKind::MapStyleUpdated,
            Self::MapLocationsUpdated(_) => EventKind::MapLocationsUpdated,
        }
    }

    /// The overlay carried by overlay events.
    #[must_use]
    pub const fn overlay(&self) -> Option<&OverlayRecord> {
        match self {
            Self::OverlayAdded(overlay) | Self::OverlayUpdated { overlay, .. } => Some(overlay),
            _ => None,
        }
    }

    /// The change set carried by [`StoreEvent::OverlayUpdated`].
    #[must_use]
    pub const fn changes(&self) -> Option<&OverlayChangeSet> {
        match self {
            Self::OverlayUpdated { changes, .. } => Some(changes),
            _ => None,
        }
    }
}
