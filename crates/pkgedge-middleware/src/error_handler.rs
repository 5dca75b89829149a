//! The error handler.
//!
//! Every [`EdgeError`] that escapes a stage ends up here. The full error,
//! with its source chain, goes to the log; the client only ever sees an
//! opaque `500 Internal Server Error`.
//!
//! If the failing request already has a response, nothing is written: the
//! response slot is write-once, and whatever was sent stays the answer.
//!
//! The handler is also a [`Middleware`], so it can be placed in a chain
//! to catch failures from everything after it:
//!
//! ```text
//! AccessLog → RequestId → Cors → [ErrorHandler] → dispatch
//! ```

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use pkgedge_core::{EdgeError, EdgeResult};

/// A failure that was turned into a response, stored as a context extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledError {
    /// [`EdgeError::kind`] of the failure.
    pub kind: &'static str,
    /// Whether the handler wrote the `500` itself.
    pub responded: bool,
}

/// Converts unexpected failures into `500` responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandler;

impl ErrorHandler {
    /// Creates the handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Logs `error` and sends the `500` unless a response already exists.
    pub fn handle(&self, ctx: &mut RequestContext, error: &EdgeError) {
        tracing::error!(
            request_id = %ctx.request_id(),
            error.kind = error.kind(),
            error.detail = %error.detail(),
            "request failed"
        );

        let responded = if ctx.response_sent() {
            tracing::warn!(
                request_id = %ctx.request_id(),
                "response already sent, keeping it"
            );
            false
        } else {
            ctx.send(Response::internal_error()).is_ok()
        };

        ctx.set_extension(HandledError {
            kind: error.kind(),
            responded,
        });
    }
}

impl Middleware for ErrorHandler {
    fn name(&self) -> &'static str {
        "error_handler"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            if let Err(error) = next.run(ctx, request).await {
                self.handle(ctx, &error);
            }
            Ok(())
        })
    }
}
