//! Fetched content.

use bytes::Bytes;
use std::time::SystemTime;

/// Bytes and metadata retrieved for an accepted [`PackageReference`](crate::PackageReference).
///
/// The payload is reference-counted ([`Bytes`]), so the emitter can build
/// a response from it without copying.
#[derive(Debug, Clone)]
pub struct FetchResult {
    version: String,
    path: String,
    body: Bytes,
    content_type: String,
    integrity: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FetchResult {
    /// Creates a fetch result for `path` inside the concrete `version`.
    pub fn new(
        version: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            path: path.into(),
            body: body.into(),
            content_type: content_type.into(),
            integrity: None,
            last_modified: None,
        }
    }

    /// Sets the content digest, also used as the entity tag.
    #[must_use]
    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    /// Sets the modification time.
    #[must_use]
    pub fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// The concrete version the reference resolved to.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The concrete file path inside the package.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The file content.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// The `Content-Type` to serve the payload with.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Content digest, if the fetcher computed one.
    pub fn integrity(&self) -> Option<&str> {
        self.integrity.as_deref()
    }

    /// Modification time, if known.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }
}
