//! Request ID middleware.
//!
//! Edge routers assign an `X-Request-ID` to every request they forward.
//! By default that value is adopted so server logs line up with router
//! logs; when it is missing (or untrusted), a UUID v7 is generated.
//!
//! The ID is always echoed back in the `X-Request-ID` response header.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::Request;
use http::HeaderValue;
use pkgedge_core::{EdgeResult, RequestId};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that adopts or generates request IDs.
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    /// Whether to adopt incoming `X-Request-ID` headers.
    trust_incoming: bool,
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdMiddleware {
    /// Creates a middleware that adopts incoming request IDs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    /// Creates a middleware that always generates a fresh ID.
    #[must_use]
    pub const fn generate_only() -> Self {
        Self {
            trust_incoming: false,
        }
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(RequestId::from_header)
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(&request)
                .unwrap_or_else(RequestId::new);
            ctx.set_request_id(request_id);

            let result = next.run(ctx, request).await;

            if let Ok(value) = HeaderValue::from_str(ctx.request_id().as_str()) {
                if let Some(response) = ctx.response_mut() {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    struct Ok200;

    impl Middleware for Ok200 {
        fn name(&self) -> &'static str {
            "ok"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, EdgeResult<()>> {
            Box::pin(async move { ctx.send(Response::text(StatusCode::OK, "ok")) })
        }
    }

    fn request(header: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/");
        if let Some(id) = header {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    #[tokio::test]
    async fn test_adopts_incoming_id() {
        let mw = RequestIdMiddleware::new();
        let terminal = Ok200;
        let mut ctx = RequestContext::new();

        mw.process(&mut ctx, request(Some("router-abc")), Next::new(&terminal, Next::end()))
            .await
            .unwrap();

        assert_eq!(ctx.request_id().as_str(), "router-abc");
        assert_eq!(
            ctx.response().unwrap().headers().get(REQUEST_ID_HEADER).unwrap(),
            "router-abc"
        );
    }

    #[tokio::test]
    async fn test_generate_only_ignores_header() {
        let mw = RequestIdMiddleware::generate_only();
        let terminal = Ok200;
        let mut ctx = RequestContext::new();

        mw.process(&mut ctx, request(Some("router-abc")), Next::new(&terminal, Next::end()))
            .await
            .unwrap();

        assert_ne!(ctx.request_id().as_str(), "router-abc");
    }

    #[tokio::test]
    async fn test_generates_when_missing() {
        let mw = RequestIdMiddleware::new();
        let mut ctx = RequestContext::new();
        let before = ctx.request_id().clone();

        mw.process(&mut ctx, request(None), Next::end()).await.unwrap();

        assert_ne!(ctx.request_id(), &before);
    }
}
