//! Package URL resolution.
//!
//! Package URLs have the shape
//!
//! ```text
//! /[@scope/]name[@version][/file/path][?meta][&module]
//! ```
//!
//! A missing version means `latest`. The version segment is kept exactly as
//! written (a concrete version, a dist-tag or a range); turning it into a
//! concrete version is the fetcher's job.

use pkgedge_core::{
    BoxFuture, EdgeError, PackageReference, ReferenceFlags, Rejection, Resolution, Resolver,
};
use regex::Regex;
use std::sync::OnceLock;

/// Version used when the URL names none.
pub const DEFAULT_VERSION: &str = "latest";

/// Longest package name the registry accepts.
pub const MAX_NAME_LEN: usize = 214;

fn package_url_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/((?:@[^/@]+/)?[^/@]+)(?:@([^/]+))?(/.*)?$").expect("valid regex")
    })
}

/// Resolves package URLs into [`PackageReference`]s.
///
/// # Rejections
///
/// | Input | Response |
/// |---|---|
/// | path that does not decode or parse | `403 Invalid URL: <path>` |
/// | `..` path segment | `403 Invalid URL: <path>` |
/// | invalid package name | `403 Invalid package name "<name>"` |
/// | legacy `?json` query | `302` to the same path with `?meta` |
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagePathResolver;

impl PackagePathResolver {
    /// Creates the resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves synchronously. [`Resolver::resolve`] wraps this.
    pub fn resolve_path(&self, path: &str, query: Option<&str>) -> Resolution {
        let params = QueryParams::parse(query);

        if params.json {
            return Resolution::Rejected(Rejection::redirect(format!("{path}?meta")));
        }

        let Ok(decoded) = urlencoding::decode(path) else {
            return invalid_url(path);
        };

        let Some(captures) = package_url_regex().captures(&decoded) else {
            return invalid_url(&decoded);
        };

        let name = captures.get(1).map_or("", |m| m.as_str());
        let version = captures
            .get(2)
            .map_or(DEFAULT_VERSION, |m| m.as_str());
        let file_path = captures.get(3).map_or("", |m| m.as_str());

        if file_path.split('/').any(|segment| segment == "..") {
            return invalid_url(&decoded);
        }

        if !is_valid_package_name(name) {
            return Resolution::Rejected(Rejection::forbidden(format!(
                "Invalid package name \"{name}\""
            )));
        }

        let file_path = if file_path == "/" { "" } else { file_path };

        Resolution::Resolved(
            PackageReference::new(name, version, file_path).with_flags(ReferenceFlags {
                meta: params.meta,
                module: params.module,
            }),
        )
    }
}

impl Resolver for PackagePathResolver {
    fn resolve<'a>(
        &'a self,
        path: &'a str,
        query: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Resolution, EdgeError>> {
        Box::pin(async move { Ok(self.resolve_path(path, query)) })
    }
}

fn invalid_url(path: &str) -> Resolution {
    Resolution::Rejected(Rejection::forbidden(format!("Invalid URL: {path}")))
}

/// Query keys the resolver cares about. Values are ignored.
#[derive(Debug, Default, PartialEq, Eq)]
struct QueryParams {
    meta: bool,
    module: bool,
    json: bool,
}

impl QueryParams {
    fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for pair in query.unwrap_or("").split('&') {
            let key = pair.split_once('=').map_or(pair, |(key, _)| key);
            match key {
                "meta" => params.meta = true,
                "module" => params.module = true,
                "json" => params.json = true,
                _ => {}
            }
        }
        params
    }
}

/// Checks a package name against the registry naming rules.
///
/// Names are lowercase, URL-safe, at most 214 characters, and neither the
/// name nor its scope may start with `.` or `_`.
///
/// ```
/// use pkgedge_packages::resolver::is_valid_package_name;
///
/// assert!(is_valid_package_name("react"));
/// assert!(is_valid_package_name("@babel/core"));
/// assert!(!is_valid_package_name("React"));
/// assert!(!is_valid_package_name(".hidden"));
/// ```
pub fn is_valid_package_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.trim() != name {
        return false;
    }

    let (scope, bare) = match name.strip_prefix('@') {
        Some(rest) => match rest.split_once('/') {
            Some((scope, bare)) => (Some(scope), bare),
            None => return false,
        },
        None => (None, name),
    };

    scope.map_or(true, is_valid_segment) && is_valid_segment(bare)
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.starts_with('_')
        && segment.chars().all(|c| {
            c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || matches!(c, '-' | '.' | '_' | '~' | '!' | '*' | '\'' | '(' | ')')
        })
}
