//! Package references.

use serde::Serialize;
use std::fmt;

/// Intent flags derived from the request query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ReferenceFlags {
    /// Only the file's metadata is requested (`?meta`).
    pub meta: bool,
    /// The file should be resolved as an ES module entry point (`?module`).
    pub module: bool,
}

impl ReferenceFlags {
    /// Renders the flags as a query string, without the leading `?`.
    ///
    /// Returns `None` when no flag is set.
    #[must_use]
    pub fn query(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.meta {
            parts.push("meta");
        }
        if self.module {
            parts.push("module");
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("&"))
        }
    }
}

/// A reference to a file inside a versioned package.
///
/// Produced by a [`Resolver`](crate::Resolver) and consumed by the policy
/// filter and the content fetcher. Fields are private so that a reference
/// cannot be changed once produced; stages that need a different
/// reference must terminate the request with a redirect instead.
///
/// # Example
///
/// ```
/// use pkgedge_core::PackageReference;
///
/// let reference = PackageReference::new("@babel/core", "7.0.0", "/lib/index.js");
/// assert_eq!(reference.scope(), Some("@babel"));
/// assert_eq!(reference.to_string(), "@babel/core@7.0.0/lib/index.js");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageReference {
    name: String,
    version: String,
    file_path: String,
    flags: ReferenceFlags,
}

impl PackageReference {
    /// Creates a reference without intent flags.
    ///
    /// `file_path` is either empty (the package entry point) or starts with `/`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            file_path: file_path.into(),
            flags: ReferenceFlags::default(),
        }
    }

    /// Returns the reference with the given intent flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ReferenceFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Full package name, including the scope when present.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope (`@scope`) of a scoped package.
    pub fn scope(&self) -> Option<&str> {
        if self.name.starts_with('@') {
            self.name.split_once('/').map(|(scope, _)| scope)
        } else {
            None
        }
    }

    /// Requested version, tag or range, exactly as written in the URL.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// File path inside the package, empty for the entry point.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Query-derived intent flags.
    pub fn flags(&self) -> ReferenceFlags {
        self.flags
    }

    /// `name@version`, as used in log lines and not-found messages.
    #[must_use]
    pub fn package_spec(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Builds the canonical URL for this package at another version and path.
    ///
    /// Intent flags are carried over to the query string.
    #[must_use]
    pub fn url_for(&self, version: &str, file_path: &str) -> String {
        let mut url = format!("/{}@{}{}", self.name, version, file_path);
        if let Some(query) = self.flags.query() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// The canonical URL of this reference.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_for(&self.version, &self.file_path)
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}{}", self.name, self.version, self.file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscoped_reference() {
        let reference = PackageReference::new("react", "18.2.0", "/index.js");
        assert_eq!(reference.scope(), None);
        assert_eq!(reference.package_spec(), "react@18.2.0");
        assert_eq!(reference.url(), "/react@18.2.0/index.js");
    }

    #[test]
    fn test_url_carries_flags() {
        let reference = PackageReference::new("react", "latest", "").with_flags(ReferenceFlags {
            meta: true,
            module: true,
        });
        assert_eq!(
            reference.url_for("18.2.0", "/index.js"),
            "/react@18.2.0/index.js?meta&module"
        );
    }

    #[test]
    fn test_flags_query_empty() {
        assert_eq!(ReferenceFlags::default().query(), None);
    }
}
