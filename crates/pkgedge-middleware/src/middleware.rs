//! Core middleware trait and types.
//!
//! Every stage, from the admission stages to the four package stages,
//! implements [`Middleware`]. A stage receives the mutable context, the
//! request and a [`Next`] handle for the rest of the chain.
//!
//! Unlike a handler-returns-response design, stages communicate the
//! response through [`RequestContext::send`]. The stage result only says
//! whether the chain completed or failed, which keeps "terminated with a
//! response" and "failed" distinct.
//!
//! # Example
//!
//! ```
//! use pkgedge_middleware::{BoxFuture, Middleware, Next, Request, RequestContext};
//! use pkgedge_core::EdgeResult;
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, EdgeResult<()>> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "chain finished");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::context::RequestContext;
use crate::types::Request;
use pkgedge_core::EdgeResult;

pub use pkgedge_core::BoxFuture;

/// The core middleware trait.
///
/// # Invariants
///
/// - A stage MUST either call `next.run()` once or send a response, never both
/// - A stage MUST NOT swallow errors returned by `next.run()`
/// - A stage MUST NOT replace context fields set by earlier stages
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage.
    ///
    /// This name is used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Process the request through this stage.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The mutable request context
    /// * `request` - The incoming HTTP request
    /// * `next` - Handle on the remaining chain
    ///
    /// # Returns
    ///
    /// `Ok(())` when the chain completed (with or without a response), or
    /// the failure that stopped it.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>>;
}

/// Handle on the remaining middleware chain.
///
/// Consumed by [`run`](Self::run), so the rest of the chain can be invoked
/// at most once. Dropping it without running is how a stage terminates the
/// request.
pub struct Next<'a> {
    /// The remaining middleware chain
    inner: NextInner<'a>,
}

/// Internal representation of the next middleware chain.
enum NextInner<'a> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain
    End,
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal `Next`.
    #[must_use]
    pub fn end() -> Self {
        Self {
            inner: NextInner::End,
        }
    }

    /// Returns true if no stages remain.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self.inner, NextInner::End)
    }

    /// Invokes the next stage.
    ///
    /// Past the last stage this completes immediately with `Ok(())`.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> EdgeResult<()> {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::End => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use crate::Response;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;
    use pkgedge_core::EdgeError;

    struct Visit {
        name: &'static str,
    }

    #[derive(Default)]
    struct Visited(Vec<&'static str>);

    impl Middleware for Visit {
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
                let mut visited = ctx.remove_extension::<Visited>().unwrap_or_default();
                visited.0.push(self.name);
                ctx.set_extension(visited);
                next.run(ctx, request).await
            })
        }
    }

    struct Respond;

    impl Middleware for Respond {
        fn name(&self) -> &'static str {
            "respond"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, EdgeResult<()>> {
            Box::pin(async move { ctx.send(Response::text(StatusCode::OK, "OK")) })
        }
    }

    struct Fail;

    impl Middleware for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut RequestContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, EdgeResult<()>> {
            Box::pin(async move { Err(EdgeError::stage("fail", "boom")) })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_end_completes() {
        let mut ctx = RequestContext::new();
        assert!(Next::end().run(&mut ctx, request()).await.is_ok());
        assert!(!ctx.response_sent());
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let first = Visit { name: "first" };
        let second = Visit { name: "second" };
        let respond = Respond;

        let mut ctx = RequestContext::new();
        let next = Next::new(&first, Next::new(&second, Next::new(&respond, Next::end())));
        next.run(&mut ctx, request()).await.unwrap();

        assert_eq!(ctx.get_extension::<Visited>().unwrap().0, vec!["first", "second"]);
        assert_eq!(ctx.response().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failure_skips_rest_of_chain() {
        let fail = Fail;
        let after = Visit { name: "after" };

        let mut ctx = RequestContext::new();
        let next = Next::new(&fail, Next::new(&after, Next::end()));
        let result = next.run(&mut ctx, request()).await;

        assert!(result.is_err());
        assert!(ctx.get_extension::<Visited>().is_none());
    }
}
