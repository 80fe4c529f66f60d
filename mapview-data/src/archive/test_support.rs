//! Builders for small MBTiles archives used by unit and behaviour tests.

use std::io::{self, Write};
use std::path::Path;

use flate2::{Compression, write::GzEncoder};
use rusqlite::{Connection, params};

/// One row to write into a fixture archive.
///
/// Coordinates are stored exactly as given, so with the default TMS scheme
/// `row` is the south-to-north row.
#[derive(Debug, Clone)]
pub struct FixtureTile {
    /// Zoom level.
    pub zoom: u8,
    /// Column.
    pub column: u32,
    /// Row as stored in the `tiles` table.
    pub row: u32,
    /// Uncompressed payload.
    pub payload: Vec<u8>,
    /// Whether the payload is gzip compressed on write.
    pub gzip: bool,
}

impl FixtureTile {
    /// A tile stored verbatim.
    #[must_use]
    pub fn plain(zoom: u8, column: u32, row: u32, payload: &[u8]) -> Self {
        Self {
            zoom,
            column,
            row,
            payload: payload.to_vec(),
            gzip: false,
        }
    }

    /// A tile stored gzip compressed.
    #[must_use]
    pub fn gzip(zoom: u8, column: u32, row: u32, payload: &[u8]) -> Self {
        Self {
            gzip: true,
            ..Self::plain(zoom, column, row, payload)
        }
    }

    fn stored_bytes(&self) -> io::Result<Vec<u8>> {
        if !self.gzip {
            return Ok(self.payload.clone());
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.payload)?;
        encoder.finish()
    }
}

/// Create an MBTiles archive at `path` with the given metadata and tiles.
///
/// # Errors
///
/// Returns an I/O error when the database cannot be written or a payload
/// cannot be compressed.
pub fn write_archive(
    path: &Path,
    metadata: &[(&str, &str)],
    tiles: &[FixtureTile],
) -> io::Result<()> {
    let connection = Connection::open(path).map_err(io::Error::other)?;
    connection
        .execute_batch(
            "CREATE TABLE metadata (name TEXT, value TEXT);
             CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER,
                                 tile_row INTEGER, tile_data BLOB);
             CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row);",
        )
        .map_err(io::Error::other)?;
    for (name, value) in metadata {
        connection
            .execute(
                "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
                params![name, value],
            )
            .map_err(io::Error::other)?;
    }
    for tile in tiles {
        connection
            .execute(
                "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![tile.zoom, tile.column, tile.row, tile.stored_bytes()?],
            )
            .map_err(io::Error::other)?;
    }
    Ok(())
}

/// Sample archive with one PNG-labelled tile at XYZ `1/0/0`.
///
/// # Errors
///
/// See [`write_archive`].
pub fn write_sample_archive(path: &Path) -> io::Result<()> {
    write_archive(
        path,
        &[("name", "Sample"), ("format", "png"), ("minzoom", "0"), ("maxzoom", "1")],
        &[
            FixtureTile::plain(0, 0, 0, b"world"),
            FixtureTile::gzip(1, 0, 1, b"north-west"),
        ],
    )
}

/// Gzip header followed by an undecodable deflate stream.
pub const CORRUPT_GZIP: &[u8] = &[0x1f, 0x8b, 0x63, 0, 0, 0, 0, 0, 0, 0xff, 0x01];

/// PNG-labelled archive whose only tile, at `0/0/0`, fails to inflate.
///
/// # Errors
///
/// See [`write_archive`].
pub fn write_corrupt_archive(path: &Path) -> io::Result<()> {
    write_archive(
        path,
        &[("name", "Corrupt"), ("format", "png")],
        &[FixtureTile::plain(0, 0, 0, CORRUPT_GZIP)],
    )
}
