//! Map groups and geo-referenced objects.
//!
//! Objects refer to groups through `group_id`. The reference is weak: the
//! store never enforces that the group exists, and lookups of a dangling id
//! simply return `None`.

use geo::Coord;

/// A named collection of geo-referenced objects.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapGroup {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl MapGroup {
    /// Construct a group without a description.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// An object pinned to a WGS84 position.
///
/// The location uses `x = longitude` and `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReferencedObject {
    /// Stable identifier.
    pub id: String,
    /// Position in degrees.
    pub location: Coord<f64>,
    /// Zoom level from which the object should be shown.
    pub zoom_level: Option<f64>,
    /// Whether the object should be drawn.
    pub show_on_map: Option<bool>,
    /// Weak reference to a [`MapGroup`].
    pub group_id: Option<String>,
}

impl GeoReferencedObject {
    /// Construct an ungrouped object at `(longitude, latitude)`.
    #[must_use]
    pub fn new(id: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            id: id.into(),
            location: Coord {
                x: longitude,
                y: latitude,
            },
            zoom_level: None,
            show_on_map: None,
            group_id: None,
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }
}

/// A geo-referenced object with a display name.
///
/// # Examples
///
/// ```
/// use mapview_core::{GeoReferencedObject, NamedGeoReferencedObject};
///
/// let object = GeoReferencedObject::new("poi-1", 7.14545, 50.722818);
/// let named = NamedGeoReferencedObject::new(object, "Bonn");
/// assert_eq!(named.object.zoom_level, Some(0.0));
/// assert_eq!(named.object.latitude(), 50.722818);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NamedGeoReferencedObject {
    /// Underlying position and grouping.
    pub object: GeoReferencedObject,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
}

impl NamedGeoReferencedObject {
    /// Attach a name to `object`, defaulting a missing zoom level to zero.
    #[must_use]
    pub fn new(mut object: GeoReferencedObject, name: impl Into<String>) -> Self {
        object.zoom_level.get_or_insert(0.0);
        Self {
            object,
            name: name.into(),
            description: None,
        }
    }

    /// Identifier of the underlying object.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.object.id
    }
}
