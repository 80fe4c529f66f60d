//! Overlay records and the field-level change sets computed between them.

use std::cmp::Ordering;
use std::fmt;

/// Opacity assigned to overlays that do not specify one.
pub const DEFAULT_OPACITY: f64 = 100.0;

/// Inclusive opacity range, expressed as a percentage.
pub const OPACITY_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// A user-configurable raster layer drawn above the base map.
///
/// `id` is the stable identity used by the store; every other field is
/// mutable through [`crate::OverlayStore::upsert`].
///
/// # Examples
///
/// ```
/// use mapview_core::OverlayRecord;
///
/// let overlay = OverlayRecord::new("o1", "Roads", "/tiles/roads/{z}/{x}/{y}.png");
/// assert!(overlay.visible);
/// assert_eq!(overlay.opacity, 100.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayRecord {
    /// Stable identifier, unique within the store.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Loose-file template or archive-relative tile reference.
    pub url: String,
    /// Free-form description.
    pub description: String,
    /// Opacity percentage in `[0, 100]`.
    pub opacity: f64,
    /// Whether the overlay is drawn.
    pub visible: bool,
}

impl OverlayRecord {
    /// Construct a visible, fully opaque overlay with an empty description.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            description: String::new(),
            opacity: DEFAULT_OPACITY,
            visible: true,
        }
    }

    /// Replace the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the opacity percentage.
    #[must_use]
    pub const fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Replace the visibility flag.
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Whether the opacity is a finite percentage within [`OPACITY_RANGE`].
    #[must_use]
    pub fn has_valid_opacity(&self) -> bool {
        self.opacity.is_finite() && OPACITY_RANGE.contains(&self.opacity)
    }

    /// Compare `self` (the stored state) with `incoming` field by field.
    ///
    /// The identifier is not part of the comparison. Only fields whose value
    /// differs appear in the returned change set, carrying the new value.
    ///
    /// # Examples
    ///
    /// ```
    /// use mapview_core::{OverlayField, OverlayRecord};
    ///
    /// let old = OverlayRecord::new("o1", "Roads", "a");
    /// let new = old.clone().with_opacity(50.0);
    /// let changes = old.diff(&new);
    /// assert_eq!(changes.fields(), vec![OverlayField::Opacity]);
    /// assert_eq!(changes.opacity, Some(50.0));
    /// ```
    #[must_use]
    pub fn diff(&self, incoming: &Self) -> OverlayChangeSet {
        OverlayChangeSet {
            name: (self.name != incoming.name).then(|| incoming.name.clone()),
            url: (self.url != incoming.url).then(|| incoming.url.clone()),
            opacity: (self.opacity.partial_cmp(&incoming.opacity) != Some(Ordering::Equal))
                .then_some(incoming.opacity),
            description: (self.description != incoming.description)
                .then(|| incoming.description.clone()),
            visible: (self.visible != incoming.visible).then_some(incoming.visible),
        }
    }
}

/// Mutable overlay fields tracked by change sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlayField {
    /// [`OverlayRecord::name`].
    Name,
    /// [`OverlayRecord::url`].
    Url,
    /// [`OverlayRecord::opacity`].
    Opacity,
    /// [`OverlayRecord::description`].
    Description,
    /// [`OverlayRecord::visible`].
    Visible,
}

impl OverlayField {
    /// Field name as it appears in persisted documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Url => "url",
            Self::Opacity => "opacity",
            Self::Description => "description",
            Self::Visible => "visible",
        }
    }
}

impl fmt::Display for OverlayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse set of overlay fields that differed on an update.
///
/// Each populated field carries the new value. An empty change set is a valid
/// result: it records that an update was attempted without altering content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayChangeSet {
    /// New display label.
    pub name: Option<String>,
    /// New tile reference.
    pub url: Option<String>,
    /// New opacity percentage.
    pub opacity: Option<f64>,
    /// New description.
    pub description: Option<String>,
    /// New visibility flag.
    pub visible: Option<bool>,
}

impl OverlayChangeSet {
    /// Whether no field changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.opacity.is_none()
            && self.description.is_none()
            && self.visible.is_none()
    }

    /// Whether `field` is part of the change set.
    #[must_use]
    pub const fn contains(&self, field: OverlayField) -> bool {
        match field {
            OverlayField::Name => self.name.is_some(),
            OverlayField::Url => self.url.is_some(),
            OverlayField::Opacity => self.opacity.is_some(),
            OverlayField::Description => self.description.is_some(),
            OverlayField::Visible => self.visible.is_some(),
        }
    }

    /// Changed fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> Vec<OverlayField> {
        [
            OverlayField::Name,
            OverlayField::Url,
            OverlayField::Opacity,
            OverlayField::Description,
            OverlayField::Visible,
        ]
        .into_iter()
        .filter(|field| self.contains(*field))
        .collect()
    }
}
