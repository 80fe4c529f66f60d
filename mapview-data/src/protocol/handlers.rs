//! Handlers for the file and archive schemes.

use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use cap_std::fs_utf8::Dir;
use mapview_core::TileCoordinate;
use url::Url;

use super::{
    ResolveError, ResourceRequest, ResourceResponse, SchemeHandler, content_type_for_path,
};
use crate::archive::ArchiveSlot;

/// Serves `<scheme>://<absolute path>` from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSchemeHandler {
    scheme: String,
}

impl FileSchemeHandler {
    /// Handler for `scheme`.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    /// Map a request URL onto a local path.
    ///
    /// The scheme is swapped for `file`, query and fragment are dropped and
    /// the remainder is percent-decoded.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when the URL does not name a local
    /// UTF-8 path.
    pub fn local_path(&self, url: &str) -> Result<Utf8PathBuf, ResolveError> {
        let not_local = || ResolveError::NotFound(format!("{url} does not name a local file"));
        let prefix = format!("{}://", self.scheme);
        let rest = url.strip_prefix(prefix.as_str()).ok_or_else(not_local)?;
        let mut file_url = Url::parse(&format!("file://{rest}")).map_err(|_| not_local())?;
        file_url.set_query(None);
        file_url.set_fragment(None);
        let path = file_url.to_file_path().map_err(|()| not_local())?;
        Utf8PathBuf::from_path_buf(path).map_err(|_| not_local())
    }

    async fn serve(&self, request: &ResourceRequest) -> Result<ResourceResponse, ResolveError> {
        let path = self.local_path(&request.url)?;
        let target = path.to_string();
        let read_path = path.clone();
        let body = tokio::task::spawn_blocking(move || mapview_fs::read_bytes(&read_path))
            .await
            .map_err(|source| ResolveError::Task {
                target: target.clone(),
                source,
            })?
            .map_err(|source| ResolveError::from_io(&target, source))?;
        Ok(ResourceResponse::ok(body, content_type_for_path(path.as_str())))
    }
}

#[async_trait]
impl SchemeHandler for FileSchemeHandler {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn handle(&self, request: ResourceRequest) -> ResourceResponse {
        self.serve(&request)
            .await
            .unwrap_or_else(ResolveError::into_response)
    }
}

/// Serves tiles from the archive under a reserved name and every other name
/// from a base directory.
#[derive(Debug, Clone)]
pub struct ArchiveSchemeHandler {
    scheme: String,
    archive_name: String,
    slot: Arc<ArchiveSlot>,
    base_dir: Option<Arc<Dir>>,
}

impl ArchiveSchemeHandler {
    /// Handler for `scheme` answering `archive_name` from `slot` and other
    /// names from `base_dir`.
    #[must_use]
    pub fn new(
        scheme: impl Into<String>,
        archive_name: impl Into<String>,
        slot: Arc<ArchiveSlot>,
        base_dir: Option<Arc<Dir>>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            archive_name: archive_name.into(),
            slot,
            base_dir,
        }
    }

    /// Slot holding the served archive; replace its contents to switch
    /// archives without rebuilding the resolver.
    #[must_use]
    pub const fn slot(&self) -> &Arc<ArchiveSlot> {
        &self.slot
    }

    async fn serve(&self, request: &ResourceRequest) -> Result<ResourceResponse, ResolveError> {
        if request.target == self.archive_name {
            self.serve_tile(request).await
        } else {
            self.serve_file(&request.target).await
        }
    }

    async fn serve_tile(&self, request: &ResourceRequest) -> Result<ResourceResponse, ResolveError> {
        let tile = requested_tile(request)?;
        let archive = self
            .slot
            .ready()
            .map_err(|state| ResolveError::NotFound(state.to_string()))?;
        let content_type = archive.metadata().content_type();
        let target = format!("{}/{tile}", self.archive_name);
        let body = tokio::task::spawn_blocking(move || archive.tile(tile))
            .await
            .map_err(|source| ResolveError::Task {
                target: target.clone(),
                source,
            })??
            .ok_or_else(|| ResolveError::NotFound(format!("tile {target}")))?;
        Ok(ResourceResponse::ok(body, content_type))
    }

    async fn serve_file(&self, name: &str) -> Result<ResourceResponse, ResolveError> {
        let Some(base) = self.base_dir.as_ref().map(Arc::clone) else {
            return Err(ResolveError::NotFound(format!(
                "{name}: no base directory configured"
            )));
        };
        let relative = Utf8PathBuf::from(name);
        let body = tokio::task::spawn_blocking(move || mapview_fs::read_within(&base, &relative))
            .await
            .map_err(|source| ResolveError::Task {
                target: name.to_owned(),
                source,
            })?
            .map_err(|source| ResolveError::from_io(name, source))?;
        Ok(ResourceResponse::ok(body, content_type_for_path(name)))
    }
}

#[async_trait]
impl SchemeHandler for ArchiveSchemeHandler {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn handle(&self, request: ResourceRequest) -> ResourceResponse {
        self.serve(&request)
            .await
            .unwrap_or_else(ResolveError::into_response)
    }
}

fn requested_tile(request: &ResourceRequest) -> Result<TileCoordinate, ResolveError> {
    let component = |key: &str| -> Result<i64, ResolveError> {
        let raw = request
            .query_value(key)
            .ok_or_else(|| ResolveError::BadRequest(format!("missing `{key}` parameter")))?;
        raw.trim()
            .parse()
            .map_err(|_| ResolveError::BadRequest(format!("`{key}` is not an integer: {raw}")))
    };
    let (zoom, x, y) = (component("z")?, component("x")?, component("y")?);
    TileCoordinate::from_raw(zoom, x, y).ok_or_else(|| {
        ResolveError::BadRequest(format!("tile {zoom}/{x}/{y} lies outside the tile grid"))
    })
}
