//! Behavioural coverage for archive lookups through an `ArchiveSlot`.

use std::cell::RefCell;
use std::path::PathBuf;

use mapview_core::TileCoordinate;
use mapview_data::archive::test_support::write_sample_archive;
use mapview_data::{ArchiveSlot, ArchiveStateError};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

struct ArchiveWorld {
    dir: TempDir,
    slot: ArchiveSlot,
    tile: RefCell<Option<Option<Vec<u8>>>>,
}

impl ArchiveWorld {
    fn sample_path(&self) -> PathBuf {
        let path = self.dir.path().join("sample.mbtiles");
        if !path.exists() {
            write_sample_archive(&path).expect("sample archive");
        }
        path
    }
}

#[fixture]
fn world() -> ArchiveWorld {
    ArchiveWorld {
        dir: TempDir::new().expect("temp dir"),
        slot: ArchiveSlot::new(),
        tile: RefCell::new(None),
    }
}

#[given("the sample tile archive is open")]
fn sample_open(world: &ArchiveWorld) {
    world.slot.replace(world.sample_path()).expect("open sample");
}

#[given("a slot pointed at a file that is not a tile archive")]
fn not_an_archive(world: &ArchiveWorld) {
    let path = world.dir.path().join("notes.mbtiles");
    std::fs::write(&path, "these are not tiles").expect("write");
    assert!(world.slot.replace(&path).is_err());
}

#[when("the slot is pointed at the sample tile archive")]
fn point_at_sample(world: &ArchiveWorld) {
    world.slot.replace(world.sample_path()).expect("open sample");
}

#[when("the tile at zoom {zoom} column {x} row {y} is requested")]
fn request_tile(world: &ArchiveWorld, zoom: u8, x: u32, y: u32) {
    let tile = TileCoordinate::new(zoom, x, y).expect("valid tile");
    world
        .tile
        .replace(Some(world.slot.tile(tile).expect("lookup")));
}

#[then("the tile body is {body}")]
fn tile_body(world: &ArchiveWorld, body: String) {
    let expected = body.trim_matches('"').as_bytes().to_vec();
    assert_eq!(*world.tile.borrow(), Some(Some(expected)));
}

#[then("no tile is returned")]
fn no_tile(world: &ArchiveWorld) {
    assert_eq!(*world.tile.borrow(), Some(None));
}

#[then("the slot reports the archive as failed")]
fn slot_failed(world: &ArchiveWorld) {
    assert!(matches!(
        world.slot.ready(),
        Err(ArchiveStateError::Failed { .. })
    ));
}

#[scenario(path = "tests/features/tile_archive.feature", index = 0)]
fn reading_tms_tile(world: ArchiveWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/tile_archive.feature", index = 1)]
fn absent_tile(world: ArchiveWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/tile_archive.feature", index = 2)]
fn not_an_archive_fails(world: ArchiveWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/tile_archive.feature", index = 3)]
fn replacing_failed_archive(world: ArchiveWorld) {
    let _ = world;
}
