//! Typed view over the MBTiles `metadata` table.

use std::collections::BTreeMap;
use std::str::FromStr;

use geo::{Coord, Rect};
use serde::Serialize;

use super::ArchiveError;

/// Row numbering used by an archive's `tiles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileScheme {
    /// Rows counted south to north; the MBTiles default.
    Tms,
    /// Rows counted north to south, matching the slippy-map request.
    Xyz,
}

impl TileScheme {
    /// Parse a `scheme` metadata value, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tms" => Some(Self::Tms),
            "xyz" => Some(Self::Xyz),
            _ => None,
        }
    }
}

/// Key/value metadata of an opened archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArchiveMetadata {
    entries: BTreeMap<String, String>,
}

impl ArchiveMetadata {
    /// Wrap raw metadata rows.
    #[must_use]
    pub const fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// All entries, ordered by key.
    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Human-readable archive name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// Tile encoding such as `png` or `pbf`.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.get("format")
    }

    /// Declared row scheme; unknown values read as `None`.
    #[must_use]
    pub fn scheme(&self) -> Option<TileScheme> {
        self.get("scheme").and_then(TileScheme::parse)
    }

    /// Shallowest zoom level with tiles.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidMetadata`] when the value is not an
    /// integer zoom level.
    pub fn min_zoom(&self) -> Result<Option<u8>, ArchiveError> {
        self.parsed("minzoom")
    }

    /// Deepest zoom level with tiles.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidMetadata`] when the value is not an
    /// integer zoom level.
    pub fn max_zoom(&self) -> Result<Option<u8>, ArchiveError> {
        self.parsed("maxzoom")
    }

    /// Extent in WGS84 degrees, stored as `west,south,east,north`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidMetadata`] unless the value holds four
    /// comma-separated numbers.
    pub fn bounds(&self) -> Result<Option<Rect<f64>>, ArchiveError> {
        let Some(raw) = self.get("bounds") else {
            return Ok(None);
        };
        match numbers("bounds", raw)?.as_slice() {
            [west, south, east, north] => Ok(Some(Rect::new(
                Coord { x: *west, y: *south },
                Coord { x: *east, y: *north },
            ))),
            _ => Err(invalid("bounds", raw)),
        }
    }

    /// Default view, stored as `longitude,latitude[,zoom]`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidMetadata`] unless the value holds two
    /// or three comma-separated numbers.
    pub fn center(&self) -> Result<Option<(Coord<f64>, Option<f64>)>, ArchiveError> {
        let Some(raw) = self.get("center") else {
            return Ok(None);
        };
        match numbers("center", raw)?.as_slice() {
            [x, y] => Ok(Some((Coord { x: *x, y: *y }, None))),
            [x, y, zoom] => Ok(Some((Coord { x: *x, y: *y }, Some(*zoom)))),
            _ => Err(invalid("center", raw)),
        }
    }

    /// MIME type matching [`Self::format`].
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format()
            .map_or("application/octet-stream", content_type_for_format)
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ArchiveError> {
        self.get(key)
            .map(|raw| raw.trim().parse().map_err(|_| invalid(key, raw)))
            .transpose()
    }

}

fn numbers(key: &str, raw: &str) -> Result<Vec<f64>, ArchiveError> {
    raw.split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|_| invalid(key, raw)))
        .collect()
}

fn invalid(key: &str, value: &str) -> ArchiveError {
    ArchiveError::InvalidMetadata {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

/// MIME type for an MBTiles `format` value.
#[must_use]
pub fn content_type_for_format(format: &str) -> &'static str {
    match format.trim().to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "pbf" | "mvt" => "application/x-protobuf",
        "json" | "geojson" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn metadata(pairs: &[(&str, &str)]) -> ArchiveMetadata {
        ArchiveMetadata::from_entries(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[rstest]
    fn parses_typed_fields() {
        let meta = metadata(&[
            ("name", "Bonn"),
            ("format", "png"),
            ("minzoom", "2"),
            ("maxzoom", "14"),
            ("bounds", "7.0, 50.6, 7.3, 50.8"),
            ("center", "7.1,50.7,12"),
            ("scheme", "XYZ"),
        ]);
        assert_eq!(meta.name(), Some("Bonn"));
        assert_eq!(meta.min_zoom().expect("minzoom"), Some(2));
        assert_eq!(meta.max_zoom().expect("maxzoom"), Some(14));
        let bounds = meta.bounds().expect("bounds").expect("present");
        assert_eq!(bounds.min(), Coord { x: 7.0, y: 50.6 });
        let (center, zoom) = meta.center().expect("center").expect("present");
        assert_eq!(center, Coord { x: 7.1, y: 50.7 });
        assert_eq!(zoom, Some(12.0));
        assert_eq!(meta.scheme(), Some(TileScheme::Xyz));
        assert_eq!(meta.content_type(), "image/png");
    }

    #[rstest]
    #[case("minzoom", "deep")]
    #[case("bounds", "1,2,3")]
    #[case("center", "a,b")]
    fn rejects_malformed_values(#[case] key: &str, #[case] value: &str) {
        let meta = metadata(&[(key, value)]);
        let result = match key {
            "minzoom" => meta.min_zoom().map(|_| ()),
            "bounds" => meta.bounds().map(|_| ()),
            _ => meta.center().map(|_| ()),
        };
        assert!(matches!(result, Err(ArchiveError::InvalidMetadata { .. })));
    }

    #[rstest]
    fn absent_fields_are_none() {
        let meta = ArchiveMetadata::default();
        assert_eq!(meta.min_zoom().expect("minzoom"), None);
        assert_eq!(meta.bounds().expect("bounds"), None);
        assert_eq!(meta.scheme(), None);
        assert_eq!(meta.content_type(), "application/octet-stream");
    }

    #[rstest]
    #[case("pbf", "application/x-protobuf")]
    #[case("JPG", "image/jpeg")]
    #[case("webp", "image/webp")]
    #[case("tiff", "application/octet-stream")]
    fn maps_formats_to_content_types(#[case] format: &str, #[case] expected: &str) {
        assert_eq!(content_type_for_format(format), expected);
    }
}
