//! Resolve stage.
//!
//! Hands the raw path and query to the [`Resolver`]. A resolved reference
//! is stored in the context for the later stages; a rejection (malformed
//! URL, normalization redirect) is sent as-is and ends the request before
//! any policy or fetch work happens.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};
use pkgedge_core::{EdgeResult, Resolution, Resolver};

/// Stage 1 of the package pipeline.
pub struct ResolveStage<R> {
    resolver: R,
}

impl<R: Resolver> ResolveStage<R> {
    /// Wraps `resolver`.
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: Resolver> Middleware for ResolveStage<R> {
    fn name(&self) -> &'static str {
        Stage::Resolve.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            let resolution = {
                let uri = request.uri();
                self.resolver.resolve(uri.path(), uri.query()).await?
            };

            match resolution {
                Resolution::Resolved(reference) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        reference = %reference,
                        "resolved package reference"
                    );
                    ctx.set_reference(reference)?;
                    next.run(ctx, request).await
                }
                Resolution::Rejected(rejection) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        status = rejection.status_code().as_u16(),
                        "resolution rejected request"
                    );
                    ctx.send(Response::rejection(&rejection))
                }
            }
        })
    }
}
