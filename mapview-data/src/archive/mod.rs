//! Read-only access to MBTiles tile archives.
//!
//! An archive is a SQLite database holding a `metadata` key/value table and
//! a `tiles` relation keyed by zoom, column and row. [`TileArchive::open`]
//! reads the metadata and builds an in-memory index of every stored tile in
//! XYZ order, so lookups that miss never touch the database. Payloads are
//! inflated on the way out when they carry a gzip or zlib header.

mod metadata;
mod slot;
#[doc(hidden)]
pub mod test_support;

pub use metadata::{ArchiveMetadata, TileScheme, content_type_for_format};
pub use slot::{ArchiveSlot, ArchiveStateError};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use flate2::read::{GzDecoder, ZlibDecoder};
use log::{debug, warn};
use mapview_core::TileCoordinate;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use thiserror::Error;

/// Read-only connections kept for reuse once a lookup finishes.
const MAX_IDLE_CONNECTIONS: usize = 4;

const RELATION_PROBE_SQL: &str =
    "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 LIMIT 1";
const METADATA_SQL: &str = "SELECT name, value FROM metadata";
const INDEX_SQL: &str = "SELECT zoom_level, tile_column, tile_row, length(tile_data) FROM tiles";
const TILE_SQL: &str = "SELECT tile_data FROM tiles \
     WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3 LIMIT 1";

/// Error raised while opening or reading a tile archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The database could not be opened.
    #[error("failed to open tile archive at {path}: {source}")]
    Open {
        /// Location of the archive on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A relation every MBTiles archive must carry is missing.
    #[error("tile archive at {path} has no `{relation}` table")]
    Schema {
        /// Location of the archive on disk.
        path: PathBuf,
        /// Name of the missing table or view.
        relation: &'static str,
    },
    /// A query against the archive failed.
    #[error("failed to {operation} in tile archive at {path}: {source}")]
    Query {
        /// Location of the archive on disk.
        path: PathBuf,
        /// What the query was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A compressed tile payload could not be inflated.
    #[error("failed to decompress tile {tile} from {path}: {source}")]
    Decompress {
        /// Location of the archive on disk.
        path: PathBuf,
        /// Tile whose payload was corrupt.
        tile: TileCoordinate,
        /// Decoder error.
        #[source]
        source: io::Error,
    },
    /// A metadata value could not be interpreted.
    #[error("metadata `{key}` has an unusable value `{value}`")]
    InvalidMetadata {
        /// Metadata key.
        key: String,
        /// Raw value as stored.
        value: String,
    },
}

/// Index record for one stored tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveIndexEntry {
    /// Size of the stored (possibly compressed) payload in bytes.
    pub byte_length: u64,
}

/// Opened MBTiles archive with its tile index.
///
/// Each lookup borrows its own read-only connection, so concurrent readers
/// never wait on each other's queries.
pub struct TileArchive {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    metadata: ArchiveMetadata,
    index: HashMap<TileCoordinate, ArchiveIndexEntry>,
    flip_rows: bool,
}

impl fmt::Debug for TileArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileArchive")
            .field("path", &self.path)
            .field("tiles", &self.index.len())
            .field("flip_rows", &self.flip_rows)
            .finish_non_exhaustive()
    }
}

impl TileArchive {
    /// Open the archive at `path` read-only and index its tiles.
    ///
    /// Rows are stored in TMS order unless the metadata declares
    /// `scheme = xyz`; the index is always keyed in XYZ order.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Open`] when the file is missing or not a
    /// SQLite database, [`ArchiveError::Schema`] when `metadata` or `tiles`
    /// is absent and [`ArchiveError::Query`] when reading either fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let archive_path = path.as_ref().to_path_buf();
        let connection = open_read_only(&archive_path)?;

        for relation in ["metadata", "tiles"] {
            require_relation(&connection, &archive_path, relation)?;
        }

        let metadata = load_metadata(&connection, &archive_path)?;
        let flip_rows = metadata.scheme() != Some(TileScheme::Xyz);
        let index = load_index(&connection, &archive_path, flip_rows)?;
        debug!(
            "opened tile archive {} with {} tiles (flip rows: {flip_rows})",
            archive_path.display(),
            index.len()
        );

        Ok(Self {
            path: archive_path,
            idle: Mutex::new(vec![connection]),
            metadata,
            index,
            flip_rows,
        })
    }

    /// Location the archive was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// Number of indexed tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the archive holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Index record for `tile`, if stored.
    #[must_use]
    pub fn index_entry(&self, tile: TileCoordinate) -> Option<ArchiveIndexEntry> {
        self.index.get(&tile).copied()
    }

    /// Stored payload for `tile` without decompression.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Query`] when the read fails and
    /// [`ArchiveError::Open`] when no further connection can be opened.
    pub fn raw_tile(&self, tile: TileCoordinate) -> Result<Option<Vec<u8>>, ArchiveError> {
        if !self.index.contains_key(&tile) {
            return Ok(None);
        }
        let row = if self.flip_rows {
            tile.flipped_row()
        } else {
            tile.y()
        };
        let connection = self.checkout()?;
        let stored = connection
            .query_row(TILE_SQL, [u32::from(tile.zoom()), tile.x(), row], |found| {
                found.get::<_, Vec<u8>>(0)
            })
            .optional()
            .map_err(|source| ArchiveError::Query {
                path: self.path.clone(),
                operation: "read tile",
                source,
            });
        self.checkin(connection);
        stored
    }

    /// Payload for `tile`, inflated when gzip or zlib compressed.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Query`] when the read fails and
    /// [`ArchiveError::Decompress`] when a compressed payload is corrupt.
    pub fn tile(&self, tile: TileCoordinate) -> Result<Option<Vec<u8>>, ArchiveError> {
        let Some(stored) = self.raw_tile(tile)? else {
            return Ok(None);
        };
        decode_payload(stored)
            .map(Some)
            .map_err(|source| ArchiveError::Decompress {
                path: self.path.clone(),
                tile,
                source,
            })
    }

    fn checkout(&self) -> Result<Connection, ArchiveError> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match reused {
            Some(connection) => Ok(connection),
            None => open_read_only(&self.path),
        }
    }

    fn checkin(&self, connection: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(connection);
        }
    }

    #[cfg(test)]
    fn idle_connections(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn open_read_only(path: &Path) -> Result<Connection, ArchiveError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Compression detected from a payload's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// gzip stream (`1f 8b`).
    Gzip,
    /// zlib stream (`78 01`, `78 5e`, `78 9c` or `78 da`).
    Zlib,
    /// Anything else; returned verbatim.
    Plain,
}

impl PayloadEncoding {
    /// Classify `payload` by its magic bytes.
    #[must_use]
    pub const fn detect(payload: &[u8]) -> Self {
        match payload {
            [0x1f, 0x8b, ..] => Self::Gzip,
            [0x78, 0x01 | 0x5e | 0x9c | 0xda, ..] => Self::Zlib,
            _ => Self::Plain,
        }
    }
}

/// Inflate `payload` according to [`PayloadEncoding::detect`].
///
/// # Errors
///
/// Returns the decoder's error when a compressed stream is truncated or
/// corrupt.
pub fn decode_payload(payload: Vec<u8>) -> io::Result<Vec<u8>> {
    let mut inflated = Vec::new();
    match PayloadEncoding::detect(&payload) {
        PayloadEncoding::Gzip => {
            GzDecoder::new(payload.as_slice()).read_to_end(&mut inflated)?;
        }
        PayloadEncoding::Zlib => {
            ZlibDecoder::new(payload.as_slice()).read_to_end(&mut inflated)?;
        }
        PayloadEncoding::Plain => return Ok(payload),
    }
    Ok(inflated)
}

fn require_relation(
    connection: &Connection,
    path: &Path,
    relation: &'static str,
) -> Result<(), ArchiveError> {
    let present = connection
        .query_row(RELATION_PROBE_SQL, [relation], |_| Ok(()))
        .optional()
        .map_err(|source| ArchiveError::Query {
            path: path.to_path_buf(),
            operation: "probe schema",
            source,
        })?
        .is_some();
    if present {
        Ok(())
    } else {
        Err(ArchiveError::Schema {
            path: path.to_path_buf(),
            relation,
        })
    }
}

fn load_metadata(connection: &Connection, path: &Path) -> Result<ArchiveMetadata, ArchiveError> {
    let query_error = |source: rusqlite::Error| ArchiveError::Query {
        path: path.to_path_buf(),
        operation: "read metadata",
        source,
    };
    let mut statement = connection.prepare(METADATA_SQL).map_err(query_error)?;
    let mut rows = statement.query([]).map_err(query_error)?;
    let mut entries = BTreeMap::new();
    while let Some(row) = rows.next().map_err(query_error)? {
        let name: Option<String> = row.get(0).map_err(query_error)?;
        let value: Option<String> = row.get(1).map_err(query_error)?;
        if let (Some(key), Some(text)) = (name, value) {
            entries.insert(key, text);
        }
    }
    Ok(ArchiveMetadata::from_entries(entries))
}

fn load_index(
    connection: &Connection,
    path: &Path,
    flip_rows: bool,
) -> Result<HashMap<TileCoordinate, ArchiveIndexEntry>, ArchiveError> {
    let query_error = |source: rusqlite::Error| ArchiveError::Query {
        path: path.to_path_buf(),
        operation: "index tiles",
        source,
    };
    let mut statement = connection.prepare(INDEX_SQL).map_err(query_error)?;
    let mut rows = statement.query([]).map_err(query_error)?;
    let mut index = HashMap::new();
    let mut skipped = 0_usize;
    while let Some(row) = rows.next().map_err(query_error)? {
        let zoom: i64 = row.get(0).map_err(query_error)?;
        let column: i64 = row.get(1).map_err(query_error)?;
        let stored_row: i64 = row.get(2).map_err(query_error)?;
        let length: Option<i64> = row.get(3).map_err(query_error)?;
        let Some(stored) = TileCoordinate::from_raw(zoom, column, stored_row) else {
            skipped = skipped.saturating_add(1);
            continue;
        };
        let tile = if flip_rows { stored.flip_y() } else { stored };
        let byte_length = length.and_then(|len| u64::try_from(len).ok()).unwrap_or(0);
        index.insert(tile, ArchiveIndexEntry { byte_length });
    }
    if skipped > 0 {
        warn!(
            "skipped {skipped} tiles with out-of-range coordinates in {}",
            path.display()
        );
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::test_support::{CORRUPT_GZIP, FixtureTile, write_archive, write_sample_archive};
    use super::*;
    use flate2::{Compression, write::ZlibEncoder};
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn tile(zoom: u8, x: u32, y: u32) -> TileCoordinate {
        TileCoordinate::new(zoom, x, y).expect("valid tile")
    }

    #[rstest]
    fn concurrent_readers_borrow_their_own_connections(dir: TempDir) {
        let path = dir.path().join("sample.mbtiles");
        write_sample_archive(&path).expect("fixture");
        let archive = TileArchive::open(&path).expect("open");

        std::thread::scope(|scope| {
            let readers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| archive.tile(tile(1, 0, 0))))
                .collect();
            for reader in readers {
                let body = reader.join().expect("reader thread").expect("read");
                assert_eq!(body, Some(b"north-west".to_vec()));
            }
        });
        assert!((1..=MAX_IDLE_CONNECTIONS).contains(&archive.idle_connections()));
    }

    #[rstest]
    fn indexes_tms_rows_in_xyz_order(dir: TempDir) {
        let path = dir.path().join("tms.mbtiles");
        write_archive(
            &path,
            &[("format", "png")],
            &[FixtureTile::plain(2, 1, 0, b"south-row")],
        )
        .expect("fixture");
        let archive = TileArchive::open(&path).expect("open");

        assert_eq!(archive.len(), 1);
        assert_eq!(
            archive.tile(tile(2, 1, 3)).expect("read"),
            Some(b"south-row".to_vec())
        );
        assert_eq!(archive.tile(tile(2, 1, 0)).expect("read"), None);
        assert_eq!(
            archive.index_entry(tile(2, 1, 3)),
            Some(ArchiveIndexEntry { byte_length: 9 })
        );
    }

    #[rstest]
    fn xyz_scheme_skips_the_flip(dir: TempDir) {
        let path = dir.path().join("xyz.mbtiles");
        write_archive(
            &path,
            &[("scheme", "xyz")],
            &[FixtureTile::plain(2, 1, 0, b"north-row")],
        )
        .expect("fixture");
        let archive = TileArchive::open(&path).expect("open");

        assert_eq!(
            archive.tile(tile(2, 1, 0)).expect("read"),
            Some(b"north-row".to_vec())
        );
    }

    #[rstest]
    fn inflates_gzip_payloads(dir: TempDir) {
        let path = dir.path().join("gzip.mbtiles");
        write_archive(&path, &[], &[FixtureTile::gzip(0, 0, 0, b"vector tile")]).expect("fixture");
        let archive = TileArchive::open(&path).expect("open");

        let raw = archive.raw_tile(tile(0, 0, 0)).expect("raw").expect("stored");
        assert_eq!(PayloadEncoding::detect(&raw), PayloadEncoding::Gzip);
        assert_eq!(
            archive.tile(tile(0, 0, 0)).expect("read"),
            Some(b"vector tile".to_vec())
        );
    }

    #[rstest]
    fn inflates_zlib_payloads() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zlib body").expect("compress");
        let compressed = encoder.finish().expect("finish");
        assert_eq!(
            PayloadEncoding::detect(&compressed),
            PayloadEncoding::Zlib
        );
        assert_eq!(decode_payload(compressed).expect("inflate"), b"zlib body");
    }

    #[rstest]
    #[case(&[0x89, b'P', b'N', b'G'])]
    #[case(&[0x1f])]
    #[case(&[])]
    fn leaves_other_payloads_untouched(#[case] payload: &[u8]) {
        assert_eq!(PayloadEncoding::detect(payload), PayloadEncoding::Plain);
        assert_eq!(decode_payload(payload.to_vec()).expect("verbatim"), payload);
    }

    #[rstest]
    fn corrupt_gzip_is_a_decompress_error(dir: TempDir) {
        let path = dir.path().join("broken.mbtiles");
        write_archive(
            &path,
            &[],
            &[FixtureTile::plain(0, 0, 0, CORRUPT_GZIP)],
        )
        .expect("fixture");
        let archive = TileArchive::open(&path).expect("open");
        let err = archive.tile(tile(0, 0, 0)).expect_err("corrupt");
        assert!(matches!(err, ArchiveError::Decompress { .. }));
    }

    #[rstest]
    fn skips_rows_outside_the_grid(dir: TempDir) {
        let path = dir.path().join("odd.mbtiles");
        write_archive(
            &path,
            &[],
            &[
                FixtureTile::plain(1, 5, 0, b"bad column"),
                FixtureTile::plain(1, 0, 0, b"good"),
            ],
        )
        .expect("fixture");
        let archive = TileArchive::open(&path).expect("open");
        assert_eq!(archive.len(), 1);
    }

    #[rstest]
    fn missing_file_fails_to_open(dir: TempDir) {
        let err = TileArchive::open(dir.path().join("absent.mbtiles")).expect_err("missing");
        assert!(matches!(err, ArchiveError::Open { .. }));
    }

    #[rstest]
    fn database_without_tiles_is_a_schema_error(dir: TempDir) {
        let path = dir.path().join("empty.db");
        let connection = Connection::open(&path).expect("create");
        connection
            .execute_batch("CREATE TABLE metadata (name TEXT, value TEXT);")
            .expect("schema");
        drop(connection);

        let err = TileArchive::open(&path).expect_err("no tiles table");
        assert!(matches!(
            err,
            ArchiveError::Schema {
                relation: "tiles",
                ..
            }
        ));
    }

    #[rstest]
    fn exposes_metadata(dir: TempDir) {
        let path = dir.path().join("meta.mbtiles");
        write_archive(&path, &[("name", "Rivers"), ("format", "pbf")], &[]).expect("fixture");
        let archive = TileArchive::open(&path).expect("open");
        assert!(archive.is_empty());
        assert_eq!(archive.metadata().name(), Some("Rivers"));
        assert_eq!(archive.metadata().content_type(), "application/x-protobuf");
        assert_eq!(archive.path(), path.as_path());
    }
}
