//! Filter stage.
//!
//! Evaluates the [`PolicyFilter`] against the resolved reference. A
//! rejected reference is answered from the decision and never reaches
//! the fetch stage.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::{Request, Response, ResponseExt};
use pkgedge_core::{EdgeError, EdgeResult, PolicyDecision, PolicyFilter};

/// Stage 2 of the package pipeline.
pub struct FilterStage<F> {
    filter: F,
}

impl<F: PolicyFilter> FilterStage<F> {
    /// Wraps `filter`.
    pub const fn new(filter: F) -> Self {
        Self { filter }
    }
}

impl<F: PolicyFilter> Middleware for FilterStage<F> {
    fn name(&self) -> &'static str {
        Stage::Filter.name()
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
            let decision = self.filter.evaluate(reference).await?;

            match decision {
                PolicyDecision::Accept => next.run(ctx, request).await,
                PolicyDecision::Reject(rejection) => {
                    tracing::info!(
                        request_id = %ctx.request_id(),
                        package = ctx.reference().map_or("-", |r| r.name()),
                        status = rejection.status_code().as_u16(),
                        "package rejected by policy"
                    );
                    ctx.send(Response::rejection(&rejection))
                }
            }
        })
    }
}
