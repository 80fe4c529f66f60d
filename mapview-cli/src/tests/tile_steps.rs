//! Behaviour-driven step definitions driving the tile CLI scenarios.

use super::helpers::Workspace;
use super::*;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

struct TileWorld {
    workspace: Workspace,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl TileWorld {
    fn run(&self, extra: &[String]) {
        let mut argv = vec![
            "mapview".to_owned(),
            "tile".to_owned(),
            format!("--{ARG_ARCHIVE}"),
            self.workspace.archive().into_string(),
        ];
        argv.extend(extra.iter().cloned());
        let parsed = Cli::try_parse_from(argv).map_err(CliError::from);
        let outcome = parsed.and_then(|cli| {
            let mut buffer = self.stdout.borrow_mut();
            run_with(cli.command, &mut *buffer)
        });
        self.result.replace(Some(outcome));
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> TileWorld {
    TileWorld {
        workspace: Workspace::new(),
        stdout: RefCell::new(Vec::new()),
        result: RefCell::new(None),
    }
}

#[given("a sample tile archive exists on disk")]
fn sample_archive_exists(#[from(world)] world: &TileWorld) {
    mapview_data::archive::test_support::write_sample_archive(
        world.workspace.archive().as_std_path(),
    )
    .expect("write sample archive");
}

#[when("the tile command runs for zoom {zoom} column {x} row {y}")]
fn run_tile_command(#[from(world)] world: &TileWorld, zoom: u8, x: u32, y: u32) {
    world.run(&[
        format!("--{ARG_ZOOM}"),
        zoom.to_string(),
        format!("--{ARG_X}"),
        x.to_string(),
        format!("--{ARG_Y}"),
        y.to_string(),
    ]);
}

#[when("the tile command runs without a zoom level")]
fn run_tile_command_without_zoom(#[from(world)] world: &TileWorld) {
    world.run(&[
        format!("--{ARG_X}"),
        "0".to_owned(),
        format!("--{ARG_Y}"),
        "0".to_owned(),
    ]);
}

#[then("the command prints {body}")]
fn command_prints(#[from(world)] world: &TileWorld, body: String) {
    let borrowed = world.result.borrow();
    borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    assert_eq!(world.stdout.borrow().as_slice(), body.trim_matches('"').as_bytes());
}

#[then("the command fails because the tile is not stored")]
fn command_fails_tile_not_stored(#[from(world)] world: &TileWorld) {
    let error = world.error();
    assert!(
        matches!(*error, CliError::TileNotFound { .. }),
        "expected TileNotFound, found {:?}",
        *error
    );
}

#[then("the command fails because {field} is missing")]
fn command_fails_missing_field(#[from(world)] world: &TileWorld, field: String) {
    let error = world.error();
    match &*error {
        CliError::MissingArgument { field: missing, .. } => {
            assert_eq!(*missing, field.trim_matches('"'));
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_tile_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/tile_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: TileWorld) {
            let _ = world;
        }
    };
}

register_tile_scenario!(tile_extracts_stored_tile, "extracting a stored tile");
register_tile_scenario!(tile_reports_absent_tile, "reporting an absent tile");
register_tile_scenario!(tile_rejects_missing_zoom, "rejecting a missing zoom level");
