//! Access log middleware.
//!
//! Outermost admission stage. It lets the rest of the chain run, then
//! writes one [`AccessRecord`] for the request, in the layout selected by
//! the environment. The record is also stored as a context extension.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::Request;
use http::StatusCode;
use pkgedge_core::types::content_length;
use pkgedge_core::EdgeResult;
use pkgedge_telemetry::{AccessLogFormat, AccessRecord};

/// Writes one access log line per request.
#[derive(Debug, Clone, Copy)]
pub struct AccessLogMiddleware {
    format: AccessLogFormat,
}

impl AccessLogMiddleware {
    /// Creates the middleware for `format`.
    #[must_use]
    pub const fn new(format: AccessLogFormat) -> Self {
        Self { format }
    }

    /// Returns the configured layout.
    #[must_use]
    pub const fn format(&self) -> AccessLogFormat {
        self.format
    }

    fn record(ctx: &RequestContext, failed: bool) -> AccessRecord {
        let status = match ctx.response() {
            Some(response) => response.status(),
            None if failed => StatusCode::INTERNAL_SERVER_ERROR,
            None => StatusCode::NOT_FOUND,
        };

        AccessRecord {
            method: ctx.method().to_string(),
            url: ctx.url().to_string(),
            host: ctx.host().map(String::from),
            request_id: Some(ctx.request_id().to_string()),
            cf_ray: ctx.cf_ray().map(String::from),
            forwarded_for: ctx.forwarded_for().map(AccessRecord::normalize_forwarded),
            status: status.as_u16(),
            bytes: ctx.response().and_then(content_length),
            elapsed: ctx.elapsed(),
        }
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            let result = next.run(ctx, request).await;

            let record = Self::record(ctx, result.is_err());
            record.emit(self.format);
            ctx.set_extension(record);

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http_body_util::Full;
    use pkgedge_core::EdgeError;

    struct Respond(StatusCode);

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
            Box::pin(async move { ctx.send(Response::text(self.0, "hello")) })
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
            Box::pin(async move { Err(EdgeError::internal("boom")) })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/react@18.2.0/index.js?meta")
            .header("host", "cdn.example")
            .header("x-forwarded-for", "1.2.3.4, 10.0.0.1")
            .header("cf-ray", "abc-SJC")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_records_response() {
        let mw = AccessLogMiddleware::new(AccessLogFormat::Production);
        let terminal = Respond(StatusCode::OK);
        let req = request();
        let mut ctx = RequestContext::from_request(&req);

        mw.process(&mut ctx, req, Next::new(&terminal, Next::end()))
            .await
            .unwrap();

        let record = ctx.get_extension::<AccessRecord>().unwrap();
        assert_eq!(record.method, "GET");
        assert_eq!(record.url, "/react@18.2.0/index.js?meta");
        assert_eq!(record.host.as_deref(), Some("cdn.example"));
        assert_eq!(record.cf_ray.as_deref(), Some("abc-SJC"));
        assert_eq!(record.forwarded_for.as_deref(), Some("1.2.3.4,10.0.0.1"));
        assert_eq!(record.status, 200);
        assert_eq!(record.bytes, Some(5));

        let line = record.production_line();
        assert!(line.starts_with("method=GET path=\"/react@18.2.0/index.js?meta\" host=cdn.example"));
        assert!(line.ends_with("status=200 bytes=5"));
    }

    #[tokio::test]
    async fn test_failure_is_logged_as_500() {
        let mw = AccessLogMiddleware::new(AccessLogFormat::Off);
        let terminal = Fail;
        let mut ctx = RequestContext::new();

        let result = mw
            .process(&mut ctx, request(), Next::new(&terminal, Next::end()))
            .await;

        assert!(result.is_err());
        let record = ctx.get_extension::<AccessRecord>().unwrap();
        assert_eq!(record.status, 500);
        assert_eq!(record.bytes, None);
    }

    #[tokio::test]
    async fn test_unanswered_is_logged_as_404() {
        let mw = AccessLogMiddleware::new(AccessLogFormat::Development);
        let mut ctx = RequestContext::new();

        mw.process(&mut ctx, request(), Next::end()).await.unwrap();

        let record = ctx.get_extension::<AccessRecord>().unwrap();
        assert_eq!(record.status, 404);
        assert!(record.development_line().starts_with("GET / 404 "));
    }
}
