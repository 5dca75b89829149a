//! Package blacklist.

use pkgedge_core::{BoxFuture, EdgeError, PackageReference, PolicyDecision, PolicyFilter, Rejection};
use std::collections::HashSet;
use std::sync::Arc;

/// Rejects references to packages on a fixed list.
///
/// The list is injected at construction and never changes afterwards;
/// clones share it.
///
/// # Example
///
/// ```
/// use pkgedge_packages::BlacklistFilter;
///
/// let filter = BlacklistFilter::new(["evil-pkg"]);
/// assert!(filter.is_blacklisted("evil-pkg"));
/// assert!(!filter.is_blacklisted("react"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlacklistFilter {
    names: Arc<HashSet<String>>,
}

impl BlacklistFilter {
    /// Creates a filter rejecting `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Arc::new(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns true if `name` is on the list.
    #[must_use]
    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of listed packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The decision for `reference`.
    #[must_use]
    pub fn decide(&self, reference: &PackageReference) -> PolicyDecision {
        let name = reference.name();
        if self.is_blacklisted(name) {
            PolicyDecision::Reject(Rejection::forbidden(format!(
                "Package \"{name}\" is blacklisted"
            )))
        } else {
            PolicyDecision::Accept
        }
    }
}

impl PolicyFilter for BlacklistFilter {
    fn evaluate<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<PolicyDecision, EdgeError>> {
        Box::pin(async move { Ok(self.decide(reference)) })
    }
}
