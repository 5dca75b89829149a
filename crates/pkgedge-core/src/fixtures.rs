//! Test doubles for the collaborator contracts.
//!
//! Every double counts its invocations through a shared [`CallCounter`]
//! and can be given an artificial async delay, which is what the pipeline
//! tests use to check ordering, short-circuiting and per-request
//! isolation.
//!
//! # Example
//!
//! ```
//! use pkgedge_core::fixtures::{FakeFetcher, FakeFilter};
//!
//! let filter = FakeFilter::deny(["left-pad"]);
//! let fetcher = FakeFetcher::echo();
//! let fetch_calls = fetcher.counter();
//! assert_eq!(fetch_calls.get(), 0);
//! # let _ = filter;
//! ```

use crate::contract::{
    BoxFuture, ContentFetcher, FetchOutcome, PolicyFilter, Resolution, Resolver, ResponseEmitter,
    StatsProvider,
};
use crate::decision::{PolicyDecision, Rejection};
use crate::error::{EdgeError, StatsError};
use crate::fetch::FetchResult;
use crate::reference::{PackageReference, ReferenceFlags};
use crate::stats::StatsSnapshot;
use crate::types::{response_with, Request, Response};
use http::StatusCode;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A shared invocation counter.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one invocation.
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the number of recorded invocations.
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

/// Splits `/name@version/file` into a reference.
///
/// Scoped names (`/@scope/name@version/file`) are supported. A missing
/// version becomes `latest`.
#[must_use]
pub fn parse_simple_path(path: &str) -> Option<PackageReference> {
    let rest = path.strip_prefix('/')?;
    let (spec, file_path) = if rest.starts_with('@') {
        let slash = rest.find('/')?;
        match rest[slash + 1..].find('/') {
            Some(i) => rest.split_at(slash + 1 + i),
            None => (rest, ""),
        }
    } else {
        match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        }
    };
    if spec.is_empty() {
        return None;
    }
    let (name, version) = match spec[1..].rfind('@') {
        Some(i) => (&spec[..=i], &spec[i + 2..]),
        None => (spec, "latest"),
    };
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some(PackageReference::new(name, version, file_path))
}

/// A resolver double built on [`parse_simple_path`].
#[derive(Debug, Clone, Default)]
pub struct FakeResolver {
    calls: CallCounter,
    delay: Option<Duration>,
    rejection: Option<Rejection>,
    fail: bool,
}

impl FakeResolver {
    /// Resolves every well-formed path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every path with `rejection`.
    #[must_use]
    pub fn rejecting(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::default()
        }
    }

    /// Fails every call with an [`EdgeError`].
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Delays every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle on the invocation counter.
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Resolver for FakeResolver {
    fn resolve<'a>(
        &'a self,
        path: &'a str,
        query: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Resolution, EdgeError>> {
        Box::pin(async move {
            self.calls.hit();
            pause(self.delay).await;
            if self.fail {
                return Err(EdgeError::stage("resolve", "resolver double failure"));
            }
            if let Some(rejection) = &self.rejection {
                return Ok(Resolution::Rejected(rejection.clone()));
            }
            let flags = ReferenceFlags {
                meta: query.is_some_and(|q| q.split('&').any(|p| p == "meta")),
                module: query.is_some_and(|q| q.split('&').any(|p| p == "module")),
            };
            Ok(match parse_simple_path(path) {
                Some(reference) => Resolution::Resolved(reference.with_flags(flags)),
                None => Resolution::Rejected(Rejection::forbidden(format!("Invalid URL: {path}"))),
            })
        })
    }
}

/// A filter double that denies a fixed set of package names.
#[derive(Debug, Clone, Default)]
pub struct FakeFilter {
    calls: CallCounter,
    delay: Option<Duration>,
    denied: Arc<HashSet<String>>,
    fail: bool,
}

impl FakeFilter {
    /// Accepts every reference.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Rejects the given package names with `403`.
    #[must_use]
    pub fn deny<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied: Arc::new(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Fails every call with an [`EdgeError`].
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Delays every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle on the invocation counter.
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl PolicyFilter for FakeFilter {
    fn evaluate<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<PolicyDecision, EdgeError>> {
        Box::pin(async move {
            self.calls.hit();
            pause(self.delay).await;
            if self.fail {
                return Err(EdgeError::stage("filter", "filter double failure"));
            }
            if self.denied.contains(reference.name()) {
                return Ok(PolicyDecision::Reject(Rejection::forbidden(format!(
                    "Package \"{}\" is blacklisted",
                    reference.name()
                ))));
            }
            Ok(PolicyDecision::Accept)
        })
    }
}

#[derive(Debug, Clone)]
enum FetchMode {
    Echo,
    Fixed(bytes::Bytes),
    Reject(Rejection),
    Fail,
}

/// A fetcher double.
///
/// In echo mode the payload is the reference's `Display` text, which makes
/// every response unique to its request.
#[derive(Debug, Clone)]
pub struct FakeFetcher {
    calls: CallCounter,
    delay: Option<Duration>,
    mode: FetchMode,
}

impl FakeFetcher {
    /// Returns the reference text as the payload.
    #[must_use]
    pub fn echo() -> Self {
        Self {
            calls: CallCounter::new(),
            delay: None,
            mode: FetchMode::Echo,
        }
    }

    /// Returns `body` for every reference.
    #[must_use]
    pub fn with_body(body: impl Into<bytes::Bytes>) -> Self {
        Self {
            mode: FetchMode::Fixed(body.into()),
            ..Self::echo()
        }
    }

    /// Rejects every reference with `rejection`.
    #[must_use]
    pub fn rejecting(rejection: Rejection) -> Self {
        Self {
            mode: FetchMode::Reject(rejection),
            ..Self::echo()
        }
    }

    /// Fails every call with an [`EdgeError`].
    #[must_use]
    pub fn failing() -> Self {
        Self {
            mode: FetchMode::Fail,
            ..Self::echo()
        }
    }

    /// Delays every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle on the invocation counter.
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl ContentFetcher for FakeFetcher {
    fn fetch<'a>(
        &'a self,
        reference: &'a PackageReference,
    ) -> BoxFuture<'a, Result<FetchOutcome, EdgeError>> {
        Box::pin(async move {
            self.calls.hit();
            pause(self.delay).await;
            let body = match &self.mode {
                FetchMode::Echo => bytes::Bytes::from(reference.to_string()),
                FetchMode::Fixed(body) => body.clone(),
                FetchMode::Reject(rejection) => {
                    return Ok(FetchOutcome::Rejected(rejection.clone()))
                }
                FetchMode::Fail => {
                    return Err(EdgeError::stage("fetch", "fetcher double failure"))
                }
            };
            Ok(FetchOutcome::Fetched(FetchResult::new(
                reference.version(),
                reference.file_path(),
                body,
                "text/plain; charset=utf-8",
            )))
        })
    }
}

/// An emitter double that writes the payload verbatim with status `200`.
#[derive(Debug, Clone, Default)]
pub struct FakeEmitter {
    calls: CallCounter,
    delay: Option<Duration>,
    fail: bool,
}

impl FakeEmitter {
    /// Emits the payload as-is.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every call with an [`EdgeError`].
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Delays every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle on the invocation counter.
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl ResponseEmitter for FakeEmitter {
    fn emit<'a>(
        &'a self,
        _request: &'a Request,
        _reference: &'a PackageReference,
        result: &'a FetchResult,
    ) -> BoxFuture<'a, Result<Response, EdgeError>> {
        Box::pin(async move {
            self.calls.hit();
            pause(self.delay).await;
            if self.fail {
                return Err(EdgeError::stage("emit", "emitter double failure"));
            }
            Ok(response_with(
                StatusCode::OK,
                result.content_type(),
                result.body().clone(),
            ))
        })
    }
}

/// A stats provider double.
#[derive(Debug, Clone)]
pub struct FakeStats {
    calls: CallCounter,
    delay: Option<Duration>,
    snapshot: Option<StatsSnapshot>,
}

impl FakeStats {
    /// Always returns `value`.
    #[must_use]
    pub fn returning(value: serde_json::Value) -> Self {
        Self {
            calls: CallCounter::new(),
            delay: None,
            snapshot: Some(StatsSnapshot::new(value)),
        }
    }

    /// Always fails with [`StatsError::Unavailable`].
    #[must_use]
    pub fn failing() -> Self {
        Self {
            calls: CallCounter::new(),
            delay: None,
            snapshot: None,
        }
    }

    /// Delays every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle on the invocation counter.
    #[must_use]
    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl StatsProvider for FakeStats {
    fn fetch_snapshot(&self) -> BoxFuture<'_, Result<StatsSnapshot, StatsError>> {
        Box::pin(async move {
            self.calls.hit();
            pause(self.delay).await;
            self.snapshot
                .clone()
                .ok_or_else(|| StatsError::Unavailable("stats double failure".to_string()))
        })
    }
}
