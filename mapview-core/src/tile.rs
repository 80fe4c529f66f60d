//! Slippy-map tile addressing.

use std::fmt;

use thiserror::Error;

/// Deepest zoom level accepted by [`TileCoordinate::new`].
pub const MAX_ZOOM: u8 = 30;

/// Address of one raster tile within an overlay, in XYZ (slippy) order.
///
/// Construction guarantees `x < 2^zoom` and `y < 2^zoom`.
///
/// # Examples
///
/// ```
/// use mapview_core::TileCoordinate;
///
/// # fn main() -> Result<(), mapview_core::TileCoordinateError> {
/// let tile = TileCoordinate::new(2, 1, 0)?;
/// assert_eq!(tile.flipped_row(), 3);
/// assert_eq!(tile.to_string(), "2/1/0");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    zoom: u8,
    x: u32,
    y: u32,
}

/// Errors returned by [`TileCoordinate::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileCoordinateError {
    /// The zoom level exceeds [`MAX_ZOOM`].
    #[error("zoom level {zoom} exceeds the maximum of {MAX_ZOOM}")]
    ZoomTooDeep {
        /// Requested zoom level.
        zoom: u8,
    },
    /// A column or row lies outside the tile grid for the zoom level.
    #[error("tile {x}/{y} lies outside the {extent}x{extent} grid at zoom {zoom}")]
    OutOfRange {
        /// Requested zoom level.
        zoom: u8,
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Tiles per axis at `zoom`.
        extent: u32,
    },
}

impl TileCoordinate {
    /// Validate and construct a tile coordinate.
    pub const fn new(zoom: u8, x: u32, y: u32) -> Result<Self, TileCoordinateError> {
        if zoom > MAX_ZOOM {
            return Err(TileCoordinateError::ZoomTooDeep { zoom });
        }
        let extent = Self::extent(zoom);
        if x >= extent || y >= extent {
            return Err(TileCoordinateError::OutOfRange { zoom, x, y, extent });
        }
        Ok(Self { zoom, x, y })
    }

    /// Construct from unchecked integers as read from a query string or
    /// database row.
    #[must_use]
    pub fn from_raw(zoom: i64, x: i64, y: i64) -> Option<Self> {
        Self::new(
            u8::try_from(zoom).ok()?,
            u32::try_from(x).ok()?,
            u32::try_from(y).ok()?,
        )
        .ok()
    }

    /// Tiles per axis at `zoom`; `zoom` must not exceed [`MAX_ZOOM`].
    #[must_use]
    pub const fn extent(zoom: u8) -> u32 {
        1_u32 << zoom
    }

    /// Zoom level.
    #[must_use]
    pub const fn zoom(self) -> u8 {
        self.zoom
    }

    /// Column, counted west to east.
    #[must_use]
    pub const fn x(self) -> u32 {
        self.x
    }

    /// Row, counted north to south.
    #[must_use]
    pub const fn y(self) -> u32 {
        self.y
    }

    /// Row in TMS order (counted south to north): `2^z - 1 - y`.
    #[must_use]
    pub const fn flipped_row(self) -> u32 {
        Self::extent(self.zoom) - 1 - self.y
    }

    /// The same tile with its row flipped between XYZ and TMS order.
    ///
    /// Flipping is an involution: applying it twice yields the original.
    #[must_use]
    pub const fn flip_y(self) -> Self {
        Self {
            zoom: self.zoom,
            x: self.x,
            y: self.flipped_row(),
        }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
