//! Fixed-order pipelines.
//!
//! A [`Pipeline`] is an immutable list of stages built once at startup and
//! shared by every request. The package pipeline is always
//!
//! 1. **Resolve** - raw path and query to a package reference
//! 2. **Filter** - blacklist policy
//! 3. **Fetch** - content retrieval
//! 4. **Emit** - response construction
//!
//! and can only be built through [`Pipeline::package`], which takes one
//! collaborator per stage in that order. There is no way to skip, repeat
//! or reorder a package stage; branching such as "serve from cache" lives
//! inside a collaborator.
//!
//! [`PipelineBuilder`] assembles free-form chains, used for the admission
//! stages that run before routing.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::stages::{EmitStage, FetchStage, FilterStage, ResolveStage};
use crate::types::Request;
use pkgedge_core::{ContentFetcher, EdgeResult, PolicyFilter, Resolver, ResponseEmitter};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered chain of stages.
///
/// Holds no per-request state; the same pipeline serves all requests
/// concurrently.
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Builds the package pipeline: resolve, filter, fetch, emit.
    pub fn package<R, F, C, E>(resolver: R, filter: F, fetcher: C, emitter: E) -> Self
    where
        R: Resolver,
        F: PolicyFilter,
        C: ContentFetcher,
        E: ResponseEmitter,
    {
        Self {
            stages: vec![
                Arc::new(ResolveStage::new(resolver)),
                Arc::new(FilterStage::new(filter)),
                Arc::new(FetchStage::new(fetcher)),
                Arc::new(EmitStage::new(emitter)),
            ],
        }
    }

    /// Runs `request` through every stage in order.
    ///
    /// Returns `Ok(())` if the chain ran to completion or a stage ended it
    /// with a response, and the first failure otherwise.
    pub async fn process(&self, ctx: &mut RequestContext, request: Request) -> EdgeResult<()> {
        self.build_chain().run(ctx, request).await
    }

    /// Builds the middleware chain for a request.
    fn build_chain(&self) -> Next<'_> {
        let mut next = Next::end();
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for free-form pipelines.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// The package pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: path resolution
    Resolve = 1,
    /// Stage 2: policy filtering
    Filter = 2,
    /// Stage 3: content retrieval
    Fetch = 3,
    /// Stage 4: response emission
    Emit = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Filter => "filter",
            Self::Fetch => "fetch",
            Self::Emit => "emit",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [Self::Resolve, Self::Filter, Self::Fetch, Self::Emit]
    }

    /// Returns true if this stage ends the chain on success.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Emit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxFuture;
    use crate::types::ResponseExt;
    use crate::Response;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;
    use pkgedge_core::fixtures::{FakeEmitter, FakeFetcher, FakeFilter, FakeResolver};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A test middleware that records its invocation order.
    struct OrderTrackingMiddleware {
        name: &'static str,
        counter: Arc<AtomicUsize>,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, EdgeResult<()>> {
            Box::pin(async move {
                self.counter.fetch_add(1, Ordering::SeqCst);
                self.order.lock().unwrap().push(self.name);
                if next.is_end() {
                    return ctx.send(Response::text(StatusCode::OK, "OK"));
                }
                next.run(ctx, request).await
            })
        }
    }

    fn request(uri: &str) -> Request {
        HttpRequest::builder()
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));
        let tracking = |name| OrderTrackingMiddleware {
            name,
            counter: counter.clone(),
            order: order.clone(),
        };

        let pipeline = Pipeline::builder()
            .stage(tracking("first"))
            .stage(tracking("second"))
            .stage(tracking("third"))
            .build();

        let mut ctx = RequestContext::new();
        pipeline.process(&mut ctx, request("/test")).await.unwrap();

        assert_eq!(ctx.response().unwrap().status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let pipeline = Pipeline::builder().build();
        let mut ctx = RequestContext::new();
        pipeline.process(&mut ctx, request("/test")).await.unwrap();
        assert!(!ctx.response_sent());
    }

    #[test]
    fn test_package_pipeline_order() {
        let pipeline = Pipeline::package(
            FakeResolver::new(),
            FakeFilter::accept_all(),
            FakeFetcher::echo(),
            FakeEmitter::new(),
        );
        let expected: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(pipeline.stage_names(), expected);
        assert_eq!(pipeline.stage_count(), 4);
    }

    #[tokio::test]
    async fn test_package_pipeline_serves_payload() {
        let pipeline = Pipeline::package(
            FakeResolver::new(),
            FakeFilter::accept_all(),
            FakeFetcher::echo(),
            FakeEmitter::new(),
        );
        let mut ctx = RequestContext::new();
        pipeline
            .process(&mut ctx, request("/react@18.2.0/index.js"))
            .await
            .unwrap();

        assert_eq!(ctx.reference().unwrap().name(), "react");
        assert_eq!(ctx.fetch_result().unwrap().path(), "/index.js");
        assert_eq!(ctx.response().unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Resolve < Stage::Filter);
        assert!(Stage::Filter < Stage::Fetch);
        assert!(Stage::Fetch < Stage::Emit);
        assert!(Stage::Emit.is_terminal());
        assert!(!Stage::Fetch.is_terminal());
    }
}
