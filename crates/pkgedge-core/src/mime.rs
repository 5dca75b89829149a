//! Content type detection.
//!
//! Used for both the pre-built site assets and files served out of
//! packages. Package sources carry many text formats browsers don't
//! know (`.ts`, `.flow`, `LICENSE`), which are served as plain text so
//! they render instead of downloading.

use std::path::Path;

/// Fallback content type for unknown binary files.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension-less file names that are plain text.
const TEXT_FILE_NAMES: &[&str] = &[
    "license", "licence", "readme", "changes", "changelog", "authors", "makefile", "notice",
];

/// Returns the content type for `path`, based on its extension.
///
/// # Example
///
/// ```
/// use pkgedge_core::mime::content_type_for;
///
/// assert_eq!(content_type_for("dist/index.js"), "application/javascript; charset=utf-8");
/// assert_eq!(content_type_for("LICENSE"), "text/plain; charset=utf-8");
/// ```
pub fn content_type_for(path: impl AsRef<Path>) -> &'static str {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" | "cjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" | "markdown" => "text/markdown; charset=utf-8",

        // Source formats without a browser-native type
        "ts" | "tsx" | "jsx" | "flow" | "coffee" | "vue" | "svelte" | "elm" | "scss" | "less"
        | "yml" | "yaml" | "toml" | "lock" | "sh" => "text/plain; charset=utf-8",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Archives
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",

        // Web
        "wasm" => "application/wasm",
        "manifest" | "webmanifest" => "application/manifest+json",

        "" if is_text_file_name(path) => "text/plain; charset=utf-8",
        _ => OCTET_STREAM,
    }
}

fn is_text_file_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| TEXT_FILE_NAMES.contains(&name.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("app.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("package.json"), "application/json; charset=utf-8");
    }

    #[test]
    fn test_source_files_are_text() {
        assert_eq!(content_type_for("src/index.ts"), "text/plain; charset=utf-8");
        assert_eq!(content_type_for("README"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_unknown_is_octet_stream() {
        assert_eq!(content_type_for("blob.bin"), OCTET_STREAM);
        assert_eq!(content_type_for("Dockerfile"), OCTET_STREAM);
    }
}
