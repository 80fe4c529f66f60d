//! Persistence document and the bridge that moves store state through it.
//!
//! [`ConfigDocument`] mirrors the on-disk settings file field for field.
//! [`ConfigBridge`] projects the store into that shape and applies a loaded
//! document back through [`OverlayStore::upsert`], so subscribers observe a
//! restored session exactly as they would observe user edits.

use geo::Coord;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{OPACITY_RANGE, OverlayRecord, SharedStore};

/// Centre used when the document omits `mapCenter`.
pub const DEFAULT_CENTER: [f64; 2] = [0.0, 0.0];

/// Zoom used when the document omits `mapZoom`.
pub const DEFAULT_ZOOM: f64 = 10.0;

const fn default_center() -> [f64; 2] {
    DEFAULT_CENTER
}

const fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

const fn default_visible() -> bool {
    true
}

const fn default_opacity() -> f64 {
    crate::DEFAULT_OPACITY
}

/// Whether a persisted entry is the base map or an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    /// Base map style.
    Map,
    /// Raster overlay.
    #[default]
    Overlay,
}

/// One entry of the persisted `maps` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMap {
    /// Stable identifier.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Base map or overlay.
    #[serde(rename = "type", default)]
    pub kind: MapType,
    /// Tile reference.
    pub url: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Whether the entry is drawn.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Opacity percentage.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl PersistedMap {
    /// Project an overlay record into the persisted shape.
    #[must_use]
    pub fn from_record(record: OverlayRecord, kind: MapType) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind,
            url: record.url,
            description: record.description,
            visible: record.visible,
            opacity: record.opacity,
        }
    }

    /// Convert back into an overlay record, discarding the map type.
    #[must_use]
    pub fn into_record(self) -> OverlayRecord {
        OverlayRecord {
            id: self.id,
            name: self.name,
            url: self.url,
            description: self.description,
            opacity: self.opacity,
            visible: self.visible,
        }
    }
}

/// The persisted settings document.
///
/// # Examples
///
/// ```
/// use mapview_core::ConfigDocument;
///
/// let doc: ConfigDocument = serde_json::from_str("{}").expect("valid JSON");
/// assert_eq!(doc.map_center, [0.0, 0.0]);
/// assert_eq!(doc.map_zoom, 10.0);
/// assert!(doc.maps.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Viewport centre as `[longitude, latitude]`.
    #[serde(rename = "mapCenter", default = "default_center")]
    pub map_center: [f64; 2],
    /// Viewport zoom.
    #[serde(rename = "mapZoom", default = "default_zoom")]
    pub map_zoom: f64,
    /// Directory scanned for loose-tile overlays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_path: Option<String>,
    /// Directory holding the vector base map assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_path: Option<String>,
    /// Base map and overlays.
    #[serde(default)]
    pub maps: Vec<PersistedMap>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            map_center: DEFAULT_CENTER,
            map_zoom: DEFAULT_ZOOM,
            overlay_path: None,
            vector_path: None,
            maps: Vec::new(),
        }
    }
}

impl ConfigDocument {
    /// The viewport stored in this document.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        let [x, y] = self.map_center;
        Viewport {
            center: Coord { x, y },
            zoom: self.map_zoom,
        }
    }
}

/// Map position owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Centre with `x = longitude`, `y = latitude`.
    pub center: Coord<f64>,
    /// Zoom level.
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        ConfigDocument::default().viewport()
    }
}

/// Counts produced by [`ConfigBridge::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    /// Entries written to the store.
    pub applied: usize,
    /// Entries dropped as malformed.
    pub skipped: usize,
}

/// Converts between the store and [`ConfigDocument`].
#[derive(Debug, Clone)]
pub struct ConfigBridge {
    store: SharedStore,
}

impl ConfigBridge {
    /// Bridge the given store.
    #[must_use]
    pub const fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Build a document from the current store state.
    ///
    /// The base map style, when set, is written first with type `map`;
    /// overlays follow in insertion order. Directory paths are carried over from
    /// `base`.
    #[must_use]
    pub fn snapshot(&self, viewport: Viewport, base: &ConfigDocument) -> ConfigDocument {
        let style = self
            .store
            .map_style()
            .map(|style| PersistedMap::from_record(style, MapType::Map));
        let overlays = self
            .store
            .list()
            .into_iter()
            .map(|overlay| PersistedMap::from_record(overlay, MapType::Overlay));
        ConfigDocument {
            map_center: [viewport.center.x, viewport.center.y],
            map_zoom: viewport.zoom,
            overlay_path: base.overlay_path.clone(),
            vector_path: base.vector_path.clone(),
            maps: style.into_iter().chain(overlays).collect(),
        }
    }

    /// Write the document's entries into the store.
    ///
    /// The first `map` entry becomes the base map style; later ones are
    /// ignored. Overlay entries are upserted individually, so existing
    /// overlays receive update events. Entries without an id are skipped and
    /// out-of-range opacity is clamped, each with a warning.
    pub fn apply(&self, doc: &ConfigDocument) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut style_seen = false;
        for mut entry in doc.maps.iter().cloned() {
            if entry.id.trim().is_empty() {
                warn!("skipping persisted map {:?} without an id", entry.name);
                report.skipped += 1;
                continue;
            }
            if !(entry.opacity.is_finite() && OPACITY_RANGE.contains(&entry.opacity)) {
                let clamped = clamp_opacity(entry.opacity);
                warn!(
                    "opacity {} for {:?} is out of range; using {clamped}",
                    entry.opacity, entry.id
                );
                entry.opacity = clamped;
            }
            match entry.kind {
                MapType::Map if style_seen => {
                    debug!("ignoring additional base map {:?}", entry.id);
                    report.skipped += 1;
                }
                MapType::Map => {
                    style_seen = true;
                    self.store.set_map_style(entry.into_record());
                    report.applied += 1;
                }
                MapType::Overlay => {
                    let id = entry.id.clone();
                    match self.store.upsert(&id, entry.into_record()) {
                        Ok(_) => report.applied += 1,
                        Err(err) => {
                            warn!("skipping persisted overlay {id:?}: {err}");
                            report.skipped += 1;
                        }
                    }
                }
            }
        }
        report
    }
}

const fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        crate::DEFAULT_OPACITY
    } else {
        opacity.clamp(*OPACITY_RANGE.start(), *OPACITY_RANGE.end())
    }
}
