//! Collaborator contracts.
//!
//! The package pipeline is composed from four collaborators, always run in
//! this order:
//!
//! ```text
//! Resolver → PolicyFilter → ContentFetcher → ResponseEmitter
//! ```
//!
//! Each collaborator either produces the input of the next one or a
//! terminal [`Rejection`]. Unexpected failures are returned as
//! [`EdgeError`] and end up at the error handler.
//!
//! All methods return a [`BoxFuture`] so the traits stay object-safe and
//! can be stored as `Arc<dyn Resolver>` and friends.

use crate::decision::{PolicyDecision, Rejection};
use crate::error::{EdgeError, StatsError};
use crate::fetch::FetchResult;
use crate::reference::PackageReference;
use crate::stats::StatsSnapshot;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of resolving a raw request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The path names a package file.
    Resolved(PackageReference),
    /// The path is malformed or needs normalizing.
    Rejected(Rejection),
}

/// Outcome of fetching content for an accepted reference.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The content was found.
    Fetched(FetchResult),
    /// The content does not exist, or lives at another URL.
    Rejected(Rejection),
}

/// Turns a raw request path and query into a [`PackageReference`].
pub trait Resolver: Send + Sync + 'static {
    /// Resolves `path` (still percent-encoded) and the raw `query`.
    fn resolve<'a>(
        &'a self,
        path: &'a str,
        query: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Resolution, EdgeError>>;
}

/// Accepts or rejects a resolved reference.
pub trait PolicyFilter: Send + Sync + 'static {
    /// Evaluates the policy for `reference`.
    fn evaluate<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<PolicyDecision, EdgeError>>;
}

/// Retrieves bytes and metadata for an accepted reference.
pub trait ContentFetcher: Send + Sync + 'static {
    /// Fetches the file named by `reference`.
    fn fetch<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<FetchOutcome, EdgeError>>;
}

/// Builds the final response for fetched content.
pub trait ResponseEmitter: Send + Sync + 'static {
    /// Produces the response for `result`.
    ///
    /// The request is available for method and conditional-request headers.
    fn emit<'a>(
        &'a self,
        request: &'a Request,
        reference: &'a PackageReference,
        result: &'a FetchResult,
    ) -> BoxFuture<'a, Result<Response, EdgeError>>;
}

/// Supplies edge-network usage statistics.
pub trait StatsProvider: Send + Sync + 'static {
    /// Fetches the current snapshot.
    fn fetch_snapshot(&self) -> BoxFuture<'_, Result<StatsSnapshot, StatsError>>;
}

impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    fn resolve<'a>(
        &'a self,
        path: &'a str,
        query: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Resolution, EdgeError>> {
        (**self).resolve(path, query)
    }
}

impl<T: PolicyFilter + ?Sized> PolicyFilter for Arc<T> {
    fn evaluate<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<PolicyDecision, EdgeError>> {
        (**self).evaluate(reference)
    }
}

impl<T: ContentFetcher + ?Sized> ContentFetcher for Arc<T> {
    fn fetch<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<FetchOutcome, EdgeError>> {
        (**self).fetch(reference)
    }
}

impl<T: ResponseEmitter + ?Sized> ResponseEmitter for Arc<T> {
    fn emit<'a>(
        &'a self,
        request: &'a Request,
        reference: &'a PackageReference,
        result: &'a FetchResult,
    ) -> BoxFuture<'a, Result<Response, EdgeError>> {
        (**self).emit(request, reference, result)
    }
}

impl<T: StatsProvider + ?Sized> StatsProvider for Arc<T> {
    fn fetch_snapshot(&self) -> BoxFuture<'_, Result<StatsSnapshot, StatsError>> {
        (**self).fetch_snapshot()
    }
}
