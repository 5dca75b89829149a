//! Fetch stage.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};
use pkgedge_core::{ContentFetcher, EdgeError, EdgeResult, FetchOutcome};

/// Stage 3 of the package pipeline.
///
/// Stores the [`ContentFetcher`] result in the context, or sends the
/// fetcher's rejection (not found, redirect to a concrete version).
pub struct FetchStage<C> {
    fetcher: C,
}

impl<C: ContentFetcher> FetchStage<C> {
    /// Wraps `fetcher`.
    pub const fn new(fetcher: C) -> Self {
        Self { fetcher }
    }
}

impl<C: ContentFetcher> Middleware for FetchStage<C> {
    fn name(&self) -> &'static str {
        Stage::Fetch.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            let reference = ctx
                .reference()
                .ok_or(EdgeError::FieldMissing("reference"))?;
            let outcome = self.fetcher.fetch(reference).await?;

            match outcome {
                FetchOutcome::Fetched(result) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        version = result.version(),
                        bytes = result.size(),
                        "fetched package file"
                    );
                    ctx.set_fetch_result(result)?;
                    next.run(ctx, request).await
                }
                FetchOutcome::Rejected(rejection) => ctx.send(Response::rejection(&rejection)),
            }
        })
    }
}
