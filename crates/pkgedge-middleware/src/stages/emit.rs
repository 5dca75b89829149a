//! Emit stage.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::pipeline::Stage;
use crate::types::Request;
use pkgedge_core::{EdgeError, EdgeResult, ResponseEmitter};

/// Stage 4 of the package pipeline.
///
/// Builds the response from the reference and fetch result with the
/// [`ResponseEmitter`] and sends it. This is the terminal stage: it never
/// runs the rest of the chain.
pub struct EmitStage<E> {
    emitter: E,
}

impl<E: ResponseEmitter> EmitStage<E> {
    /// Wraps `emitter`.
    pub const fn new(emitter: E) -> Self {
        Self { emitter }
    }
}

impl<E: ResponseEmitter> Middleware for EmitStage<E> {
    fn name(&self) -> &'static str {
        Stage::Emit.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        _next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            let reference = ctx
                .reference()
                .ok_or(EdgeError::FieldMissing("reference"))?;
            let result = ctx
                .fetch_result()
                .ok_or(EdgeError::FieldMissing("fetch_result"))?;
            let response = self.emitter.emit(&request, reference, result).await?;
            ctx.send(response)
        })
    }
}
