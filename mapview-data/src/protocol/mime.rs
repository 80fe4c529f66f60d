//! Content types for served files.

use camino::Utf8Path;

/// MIME type for a resource, chosen by file extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
#[must_use]
pub fn content_type_for_path(path: &str) -> &'static str {
    let extension = Utf8Path::new(path)
        .extension()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pbf" | "mvt" => "application/x-protobuf",
        "json" | "geojson" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
