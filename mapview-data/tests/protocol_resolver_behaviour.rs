//! Behavioural coverage for custom-scheme resolution.

use std::cell::RefCell;
use std::fs;

use camino::Utf8PathBuf;
use mapview_data::archive::test_support::{write_corrupt_archive, write_sample_archive};
use mapview_data::{ProtocolResolver, ResolverConfig, ResourceResponse};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use tokio::runtime::Builder;

fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

struct ResolverWorld {
    _dir: TempDir,
    root: Utf8PathBuf,
    resolver: RefCell<Option<ProtocolResolver>>,
    response: RefCell<Option<ResourceResponse>>,
}

impl ResolverWorld {
    fn resolve(&self, url: &str) {
        let response = {
            let borrowed = self.resolver.borrow();
            let resolver = borrowed.as_ref().expect("resolver must be built");
            block_on(resolver.resolve(url))
        };
        self.response.replace(Some(response));
    }

    fn with_response<T>(&self, check: impl FnOnce(&ResourceResponse) -> T) -> T {
        let borrowed = self.response.borrow();
        check(borrowed.as_ref().expect("a resource must have been resolved"))
    }
}

#[fixture]
fn world() -> ResolverWorld {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    ResolverWorld {
        _dir: dir,
        root,
        resolver: RefCell::new(None),
        response: RefCell::new(None),
    }
}

#[given("a resolver serving the sample archive and base directory")]
fn resolver_ready(world: &ResolverWorld) {
    let archive = world.root.join("sample.mbtiles");
    write_sample_archive(archive.as_std_path()).expect("sample archive");
    let base = world.root.join("base");
    fs::create_dir_all(base.join("styles")).expect("mkdir");
    fs::write(base.join("styles/basic.json"), br#"{"version":8}"#).expect("write style");
    fs::create_dir_all(world.root.join("overlays/roads/3/4")).expect("mkdir");
    fs::write(world.root.join("overlays/roads/3/4/2.png"), b"local tile").expect("write tile");

    let config = ResolverConfig {
        archive_path: Some(archive),
        base_dir: Some(base),
        ..ResolverConfig::default()
    };
    world
        .resolver
        .replace(Some(ProtocolResolver::from_config(&config).expect("build resolver")));
}

#[given("a resolver serving an archive with a corrupt tile")]
fn resolver_with_corrupt_tile(world: &ResolverWorld) {
    let archive = world.root.join("corrupt.mbtiles");
    write_corrupt_archive(archive.as_std_path()).expect("corrupt archive");
    let config = ResolverConfig {
        archive_path: Some(archive),
        ..ResolverConfig::default()
    };
    world
        .resolver
        .replace(Some(ProtocolResolver::from_config(&config).expect("build resolver")));
}

#[when("the resource {url} is resolved")]
fn resolve_url(world: &ResolverWorld, url: String) {
    world.resolve(url.trim_matches('"'));
}

#[when("the local overlay tile is fetched through the file scheme")]
fn fetch_local(world: &ResolverWorld) {
    let url = format!("mapview-file://{}/overlays/roads/3/4/2.png", world.root);
    world.resolve(&url);
}

#[then("the response status is {status}")]
fn status_is(world: &ResolverWorld, status: u16) {
    world.with_response(|response| assert_eq!(response.status, status, "{response:?}"));
}

#[then("the response body is {body}")]
fn body_is(world: &ResolverWorld, body: String) {
    world.with_response(|response| {
        assert_eq!(response.body, body.trim_matches('"').as_bytes());
    });
}

#[then("the response content type is {content_type}")]
fn content_type_is(world: &ResolverWorld, content_type: String) {
    world.with_response(|response| {
        assert_eq!(response.content_type(), Some(content_type.trim_matches('"')));
    });
}

#[scenario(path = "tests/features/protocol_resolver.feature", index = 0)]
fn tile_by_coordinates(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/protocol_resolver.feature", index = 1)]
fn missing_coordinate(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/protocol_resolver.feature", index = 2)]
fn style_from_base_dir(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/protocol_resolver.feature", index = 3)]
fn local_file(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/protocol_resolver.feature", index = 4)]
fn unregistered_scheme(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/protocol_resolver.feature", index = 5)]
fn undecodable_tile(world: ResolverWorld) {
    let _ = world;
}
