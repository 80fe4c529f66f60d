//! Resolution of the viewer's custom URL schemes.
//!
//! The rendering surface fetches overlay tiles and local resources through
//! custom schemes. [`ProtocolResolver`] dispatches each URL to the
//! [`SchemeHandler`] registered for its scheme and always answers with a
//! [`ResourceResponse`]: failures become `4xx`/`5xx` statuses rather than
//! errors, because the caller is a renderer that only understands HTTP-like
//! replies.

mod config;
mod handlers;
mod mime;

pub use config::{DEFAULT_ARCHIVE_NAME, DEFAULT_ARCHIVE_SCHEME, DEFAULT_FILE_SCHEME, ResolverConfig};
pub use handlers::{ArchiveSchemeHandler, FileSchemeHandler};
pub use mime::content_type_for_path;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use log::{debug, error, warn};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

use crate::archive::{ArchiveError, ArchiveSlot};

/// `200 OK`.
pub const STATUS_OK: u16 = 200;
/// `400 Bad Request`.
pub const STATUS_BAD_REQUEST: u16 = 400;
/// `404 Not Found`.
pub const STATUS_NOT_FOUND: u16 = 404;
/// `500 Internal Server Error`.
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// A custom-scheme URL split into the parts handlers route on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// The URL exactly as requested.
    pub url: String,
    /// Scheme without the `://` separator.
    pub scheme: String,
    /// Percent-decoded authority and path with leading separators removed.
    pub target: String,
    /// Decoded query pairs in request order.
    pub query: Vec<(String, String)>,
}

/// Error raised when a URL cannot be split into a [`ResourceRequest`].
#[derive(Debug, Error)]
#[error("malformed resource url `{url}`: {source}")]
pub struct MalformedUrl {
    /// The rejected URL.
    pub url: String,
    /// Parser failure.
    #[source]
    pub source: url::ParseError,
}

impl ResourceRequest {
    /// Parse `url`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedUrl`] when `url` is not an absolute URL.
    pub fn parse(url: &str) -> Result<Self, MalformedUrl> {
        let parsed = Url::parse(url).map_err(|source| MalformedUrl {
            url: url.to_owned(),
            source,
        })?;
        let raw_target = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());
        let target = percent_decode_str(raw_target.trim_start_matches('/'))
            .decode_utf8_lossy()
            .into_owned();
        let query = parsed
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Ok(Self {
            url: url.to_owned(),
            scheme: parsed.scheme().to_owned(),
            target,
            query,
        })
    }

    /// First value for query parameter `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP-like reply handed back to the rendering surface.
#[derive(Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    /// Status code.
    pub status: u16,
    /// Response headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl fmt::Debug for ResourceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl ResourceResponse {
    /// A `200` response carrying `body`.
    #[must_use]
    pub fn ok(body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status: STATUS_OK,
            headers: vec![("Content-Type".to_owned(), content_type.to_owned())],
            body,
        }
    }

    /// A plain-text error response.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "Content-Type".to_owned(),
                "text/plain; charset=utf-8".to_owned(),
            )],
            body: message.as_bytes().to_vec(),
        }
    }

    /// Value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Whether the status is `2xx`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Handler for one URL scheme.
#[async_trait]
pub trait SchemeHandler: Send + Sync {
    /// Scheme served, without `://`.
    fn scheme(&self) -> &str;

    /// Answer `request`; failures are expressed as statuses.
    async fn handle(&self, request: ResourceRequest) -> ResourceResponse;
}

/// Failure while serving a request, before it is mapped to a status.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The request is missing or has unusable parameters.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Nothing is available at the requested location.
    #[error("not found: {0}")]
    NotFound(String),
    /// Reading a file failed.
    #[error("failed to read {target}: {source}")]
    Io {
        /// Requested target.
        target: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Reading from the tile archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// A blocking read task did not complete.
    #[error("read task for {target} did not complete: {source}")]
    Task {
        /// Requested target.
        target: String,
        /// Join failure.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ResolveError {
    /// Classify an I/O failure; missing files and paths refused by the
    /// capability layer read as not found.
    #[must_use]
    pub fn from_io(target: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::NotFound(format!("{target}: {source}"))
            }
            _ => Self::Io {
                target: target.to_owned(),
                source,
            },
        }
    }

    /// Status code reported for this failure.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => STATUS_BAD_REQUEST,
            Self::NotFound(_) => STATUS_NOT_FOUND,
            Self::Io { .. } | Self::Archive(_) | Self::Task { .. } => STATUS_INTERNAL_ERROR,
        }
    }

    /// Convert into the reply sent to the rendering surface.
    #[must_use]
    pub fn into_response(self) -> ResourceResponse {
        let status = self.status();
        let message = self.to_string();
        if status == STATUS_INTERNAL_ERROR {
            error!("{message}");
        } else {
            debug!("{message}");
        }
        ResourceResponse::error(status, &message)
    }
}

/// Error raised while building a resolver from configuration.
#[derive(Debug, Error)]
pub enum ResolverBuildError {
    /// The base directory could not be opened.
    #[error("failed to open base directory {path}: {source}")]
    BaseDir {
        /// Configured directory.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Two handlers claim the same scheme.
    #[error("scheme `{0}` is registered twice")]
    DuplicateScheme(String),
}

/// Dispatches custom-scheme URLs to their handlers.
///
/// The resolver is `Send + Sync`; share it behind an [`Arc`].
#[derive(Default)]
pub struct ProtocolResolver {
    handlers: HashMap<String, Arc<dyn SchemeHandler>>,
}

impl fmt::Debug for ProtocolResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<&String> = self.handlers.keys().collect();
        schemes.sort();
        f.debug_struct("ProtocolResolver")
            .field("schemes", &schemes)
            .finish()
    }
}

impl ProtocolResolver {
    /// A resolver with no schemes registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for its scheme, replacing any previous handler.
    #[must_use]
    pub fn with_handler(mut self, handler: impl SchemeHandler + 'static) -> Self {
        self.handlers
            .insert(handler.scheme().to_owned(), Arc::new(handler));
        self
    }

    /// Build the file and archive handlers described by `config`.
    ///
    /// The archive is opened immediately. An archive that fails to open does
    /// not fail the build; its slot reports not-found until replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverBuildError`] when the base directory cannot be
    /// opened or both handlers are configured with the same scheme.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolverBuildError> {
        if config.file_scheme == config.archive_scheme {
            return Err(ResolverBuildError::DuplicateScheme(
                config.file_scheme.clone(),
            ));
        }
        let base_dir = config
            .base_dir
            .as_ref()
            .map(|path| {
                mapview_fs::open_base_dir(path)
                    .map(Arc::new)
                    .map_err(|source| ResolverBuildError::BaseDir {
                        path: path.clone(),
                        source,
                    })
            })
            .transpose()?;
        let slot = Arc::new(
            config
                .archive_path
                .as_ref()
                .map_or_else(ArchiveSlot::new, ArchiveSlot::opened),
        );
        if config.archive_path.is_none() {
            warn!("no tile archive configured; tile requests will report not found");
        }
        Ok(Self::new()
            .with_handler(FileSchemeHandler::new(config.file_scheme.clone()))
            .with_handler(ArchiveSchemeHandler::new(
                config.archive_scheme.clone(),
                config.archive_name.clone(),
                slot,
                base_dir,
            )))
    }

    /// Registered schemes, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Resolve `url` to a response.
    ///
    /// Malformed URLs answer `400` and unknown schemes `404`.
    pub async fn resolve(&self, url: &str) -> ResourceResponse {
        let request = match ResourceRequest::parse(url) {
            Ok(request) => request,
            Err(error) => return ResolveError::BadRequest(error.to_string()).into_response(),
        };
        let Some(handler) = self.handlers.get(&request.scheme) else {
            return ResolveError::NotFound(format!("no handler for scheme `{}`", request.scheme))
                .into_response();
        };
        let response = handler.handle(request).await;
        debug!("resolved {url} with status {}", response.status);
        response
    }
}
