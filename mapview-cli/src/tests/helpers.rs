//! Temporary workspaces holding sample archives and overlays.

use camino::Utf8PathBuf;
use mapview_data::archive::test_support::write_sample_archive;
use tempfile::TempDir;

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn with_sample_archive() -> Self {
        let workspace = Self::new();
        write_sample_archive(workspace.archive().as_std_path()).expect("write sample archive");
        workspace
    }

    pub(super) fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    pub(super) fn archive(&self) -> Utf8PathBuf {
        self.root.join("sample.mbtiles")
    }

    pub(super) fn add_overlay(&self, name: &str) -> Utf8PathBuf {
        let dir = self.root.join("overlays").join(name);
        std::fs::create_dir_all(&dir).expect("create overlay directory");
        dir
    }
}
