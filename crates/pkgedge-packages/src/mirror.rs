//! Local package mirror.
//!
//! Packages are read from an unpacked mirror on disk:
//!
//! ```text
//! <root>/
//!   react/
//!     tags.json            {"latest": "18.2.0", "next": "18.3.0-canary.1"}
//!     18.2.0/
//!       package.json
//!       index.js
//!   @babel/core/
//!     7.24.0/...
//! ```
//!
//! `tags.json` is optional; without it `latest` is the highest release.

use crate::integrity::integrity;
use crate::version::{Version, VersionRange};
use pkgedge_core::mime::content_type_for;
use pkgedge_core::{
    BoxFuture, ContentFetcher, EdgeError, FetchOutcome, FetchResult, PackageReference, Rejection,
};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Name of the per-package dist-tag file.
pub const TAGS_FILE: &str = "tags.json";

/// Entry point used when `package.json` names none.
pub const DEFAULT_ENTRY: &str = "index.js";

/// Dist-tag used when no `tags.json` exists.
pub const DEFAULT_TAG: &str = "latest";

/// Serves package files out of a mirror directory.
///
/// Every outcome other than "file found" is a [`Rejection`]:
///
/// | Situation | Response |
/// |---|---|
/// | package or version unknown | `404 Cannot find package <name>@<version>` |
/// | tag or range in the URL | `302` to the concrete version |
/// | no file path | `302` to the package entry point |
/// | file missing | `404 Cannot find "<path>" in <name>@<version>` |
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    root: PathBuf,
}

impl MirrorFetcher {
    /// Creates a fetcher reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The mirror directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn fetch_reference(&self, reference: &PackageReference) -> Result<FetchOutcome, EdgeError> {
        let package_dir = match safe_join(&self.root, reference.name()) {
            Some(dir) if is_dir(&dir).await? => dir,
            _ => return Ok(package_not_found(reference)),
        };

        let spec = reference.version();
        let Some(version) = self.resolve_version(&package_dir, spec).await? else {
            return Ok(package_not_found(reference));
        };

        if version != spec {
            let location = reference.url_for(&version, reference.file_path());
            tracing::debug!(package = reference.name(), spec, version = %version, "resolved version spec");
            return Ok(FetchOutcome::Rejected(Rejection::redirect(location)));
        }

        let version_dir = package_dir.join(&version);

        if reference.file_path().is_empty() {
            let entry = entry_point(&version_dir, reference.flags().module).await?;
            return Ok(FetchOutcome::Rejected(Rejection::redirect(
                reference.url_for(&version, &entry),
            )));
        }

        let file_path = reference.file_path();
        let not_found = || {
            FetchOutcome::Rejected(Rejection::not_found(format!(
                "Cannot find \"{file_path}\" in {}@{version}",
                reference.name()
            )))
        };

        let Some(full_path) = safe_join(&version_dir, file_path) else {
            return Ok(not_found());
        };
        let Some(metadata) = metadata(&full_path).await? else {
            return Ok(not_found());
        };
        if !metadata.is_file() {
            return Ok(not_found());
        }

        let body = tokio::fs::read(&full_path).await.map_err(|e| {
            EdgeError::stage_with_source("fetch", format!("failed to read {}", full_path.display()), e)
        })?;

        let digest = integrity(&body);
        let mut result = FetchResult::new(version.clone(), file_path, body, content_type_for(file_path))
            .with_integrity(digest);
        if let Ok(modified) = metadata.modified() {
            result = result.with_last_modified(modified);
        }

        Ok(FetchOutcome::Fetched(result))
    }

    /// Turns a version segment into a concrete version present in the mirror.
    async fn resolve_version(&self, package_dir: &Path, spec: &str) -> Result<Option<String>, EdgeError> {
        if Version::parse(spec).is_some() && is_dir(&package_dir.join(spec)).await? {
            return Ok(Some(spec.to_string()));
        }

        let tags = read_tags(package_dir).await?;
        if let Some(version) = tags.get(spec) {
            return Ok(is_dir(&package_dir.join(version))
                .await?
                .then(|| version.clone()));
        }

        let range = match VersionRange::parse(spec) {
            Some(range) => range,
            None if spec == DEFAULT_TAG => VersionRange::Any,
            None => return Ok(None),
        };

        let versions = list_versions(package_dir).await?;
        Ok(range
            .max_satisfying(versions.keys())
            .and_then(|v| versions.get(v).cloned()))
    }
}

impl ContentFetcher for MirrorFetcher {
    fn fetch<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<FetchOutcome, EdgeError>> {
        Box::pin(self.fetch_reference(reference))
    }
}

fn package_not_found(reference: &PackageReference) -> FetchOutcome {
    FetchOutcome::Rejected(Rejection::not_found(format!(
        "Cannot find package {}",
        reference.package_spec()
    )))
}

/// Joins `relative` onto `base`, refusing anything but plain segments.
fn safe_join(base: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    let mut out = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => out.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

/// A path that does not exist, or that runs through a regular file.
fn is_absent(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

async fn metadata(path: &Path) -> Result<Option<std::fs::Metadata>, EdgeError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(EdgeError::stage_with_source(
            "fetch",
            format!("failed to stat {}", path.display()),
            e,
        )),
    }
}

async fn is_dir(path: &Path) -> Result<bool, EdgeError> {
    Ok(metadata(path).await?.is_some_and(|m| m.is_dir()))
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, EdgeError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(EdgeError::stage_with_source(
            "fetch",
            format!("failed to read {}", path.display()),
            e,
        )),
    }
}

async fn read_tags(package_dir: &Path) -> Result<HashMap<String, String>, EdgeError> {
    let path = package_dir.join(TAGS_FILE);
    match read_optional(&path).await? {
        Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            EdgeError::stage_with_source("fetch", format!("invalid {}", path.display()), e)
        }),
        None => Ok(HashMap::new()),
    }
}

/// Concrete versions in a package directory, keyed by parsed version.
async fn list_versions(package_dir: &Path) -> Result<HashMap<Version, String>, EdgeError> {
    let io_error = |e: io::Error| {
        EdgeError::stage_with_source(
            "fetch",
            format!("failed to list {}", package_dir.display()),
            e,
        )
    };

    let mut versions = HashMap::new();
    let mut entries = tokio::fs::read_dir(package_dir).await.map_err(io_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        if !entry.file_type().await.map_err(io_error)?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if let Some(version) = Version::parse(name) {
                versions.insert(version, name.to_string());
            }
        }
    }
    Ok(versions)
}

/// The entry file of a package version, as a path starting with `/`.
///
/// Uses `module` (when requested) or `main` from `package.json`, falling
/// back to `index.js`. Extension-less entries are resolved the way Node
/// does: the file itself, then `.js`, then `/index.js`.
async fn entry_point(version_dir: &Path, module: bool) -> Result<String, EdgeError> {
    let manifest = match read_optional(&version_dir.join("package.json")).await? {
        Some(bytes) => serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
            EdgeError::stage_with_source(
                "fetch",
                format!("invalid package.json in {}", version_dir.display()),
                e,
            )
        })?,
        None => serde_json::Value::Null,
    };

    let field = |key: &str| {
        manifest
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
    };
    let entry = module
        .then(|| field("module"))
        .flatten()
        .or_else(|| field("main"))
        .unwrap_or_else(|| DEFAULT_ENTRY.to_string());

    let entry = entry.trim_start_matches("./").trim_start_matches('/');
    let entry = entry.trim_end_matches('/');

    for candidate in [entry.to_string(), format!("{entry}.js"), format!("{entry}/index.js")] {
        if let Some(path) = safe_join(version_dir, &candidate) {
            if metadata(&path).await?.is_some_and(|m| m.is_file()) {
                return Ok(format!("/{candidate}"));
            }
        }
    }

    Ok(format!("/{entry}"))
}
