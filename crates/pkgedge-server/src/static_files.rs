//! Pre-built site assets.
//!
//! Files under the assets directory (`build/` by default) are served ahead
//! of the package pipeline with a long cache lifetime:
//!
//! - `Cache-Control`, `ETag` and `Last-Modified` on every hit
//! - `304 Not Modified` for matching `If-None-Match` / `If-Modified-Since`
//! - `HEAD` answered with headers only
//!
//! Anything that is not a plain, visible, existing file below the root
//! (directories, dotfiles, `..` segments, symlinks leaving the root, other
//! methods) is a miss, and the request continues to the package pipeline.
//!
//! ```rust
//! use pkgedge_server::static_files::StaticFiles;
//!
//! let files = StaticFiles::new("build").cache_control("public, max-age=3600");
//! assert_eq!(files.root(), std::path::Path::new("build"));
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use pkgedge_core::mime::content_type_for;
use pkgedge_core::types::response_with;
use pkgedge_core::{EdgeResult, Request, Response};

/// Default `Cache-Control` for assets: one year.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Static asset server rooted at a directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    cache_control: String,
    serve_hidden: bool,
}

impl StaticFiles {
    /// Creates an asset server for `root` with a one-year cache lifetime.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            serve_hidden: false,
        }
    }

    /// Sets the `Cache-Control` value sent with every asset.
    #[must_use]
    pub fn cache_control<S: Into<String>>(mut self, value: S) -> Self {
        self.cache_control = value.into();
        self
    }

    /// Sets the cache lifetime in seconds.
    #[must_use]
    pub fn max_age(self, secs: u64) -> Self {
        self.cache_control(format!("public, max-age={secs}"))
    }

    /// Whether dotfiles may be served. Off by default.
    #[must_use]
    pub fn serve_hidden(mut self, enabled: bool) -> Self {
        self.serve_hidden = enabled;
        self
    }

    /// The asset directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serves `request` if it names an asset.
    ///
    /// Returns `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a matching file exists but cannot be read.
    pub async fn serve(&self, request: &Request) -> EdgeResult<Option<Response>> {
        let method = request.method();
        if method != Method::GET && method != Method::HEAD {
            return Ok(None);
        }

        let Some(path) = self.resolve_path(request.uri().path()).await else {
            return Ok(None);
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let modified = metadata.modified().ok();
        let etag = etag_for(metadata.len(), modified);

        if is_fresh(request.headers(), &etag, modified) {
            return Ok(Some(self.not_modified(&etag, modified)));
        }

        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(tokio::fs::read(&path).await?)
        };

        let mut response = response_with(StatusCode::OK, content_type_for(&path), body);
        if method == Method::HEAD {
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        }
        self.cache_headers(response.headers_mut(), &etag, modified);

        tracing::debug!(path = %path.display(), "served static asset");
        Ok(Some(response))
    }

    /// Maps a URL path onto the asset directory.
    ///
    /// `None` for traversal attempts, hidden files when disallowed, and
    /// paths that resolve outside the root.
    async fn resolve_path(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(name) => {
                    if !self.serve_hidden && name.to_str().map_or(true, |n| n.starts_with('.')) {
                        return None;
                    }
                }
                Component::CurDir => {}
                _ => return None,
            }
        }

        let full_path = self.root.join(relative);
        let canonical = tokio::fs::canonicalize(&full_path).await.ok()?;
        let canonical_root = tokio::fs::canonicalize(&self.root).await.ok()?;
        canonical.starts_with(&canonical_root).then_some(canonical)
    }

    fn cache_headers(&self, headers: &mut HeaderMap, etag: &str, modified: Option<SystemTime>) {
        if let Ok(value) = HeaderValue::from_str(&self.cache_control) {
            headers.insert(header::CACHE_CONTROL, value);
        }
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(header::ETAG, value);
        }
        if let Some(modified) = modified {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
                headers.insert(header::LAST_MODIFIED, value);
            }
        }
    }

    fn not_modified(&self, etag: &str, modified: Option<SystemTime>) -> Response {
        let mut response = Response::new(http_body_util::Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        self.cache_headers(response.headers_mut(), etag, modified);
        response
    }
}

/// Weak validator from size and modification time.
fn etag_for(size: u64, modified: Option<SystemTime>) -> String {
    let mtime = modified
        .and_then(|m| m.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis());
    format!("W/\"{size:x}-{mtime:x}\"")
}

fn is_fresh(headers: &HeaderMap, etag: &str, modified: Option<SystemTime>) -> bool {
    if let Some(value) = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        return value == "*" || value.split(',').any(|candidate| candidate.trim() == etag);
    }

    let since = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok());

    match (modified, since) {
        (Some(modified), Some(since)) => {
            let secs = |t: SystemTime| {
                t.duration_since(SystemTime::UNIX_EPOCH)
                    .map_or(0, |d| d.as_secs())
            };
            secs(modified) <= secs(since)
        }
        _ => false,
    }
}
