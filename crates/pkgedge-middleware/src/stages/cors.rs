//! CORS middleware.
//!
//! Package files are loaded from any site, so every response carries
//! `Access-Control-Allow-Origin: *`. Preflight requests (`OPTIONS` with
//! `Access-Control-Request-Method`) are answered here with
//! `204 No Content` and never reach routing. A plain `OPTIONS` is routed
//! like any other request.
//!
//! ```
//! use pkgedge_middleware::stages::CorsMiddleware;
//! use std::time::Duration;
//!
//! let cors = CorsMiddleware::permissive().max_age(Duration::from_secs(86_400));
//! # let _ = cors;
//! ```

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use http::{HeaderValue, Method, StatusCode};
use pkgedge_core::types::response_with;
use pkgedge_core::EdgeResult;
use std::time::Duration;

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin`
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods`
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers`
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Max-Age`
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Request-Method`
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Access-Control-Request-Headers`
    pub const REQUEST_HEADERS: &str = "access-control-request-headers";
}

/// Methods granted to every origin in preflight answers.
pub const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Grants cross-origin access to every route.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    origin: HeaderValue,
    methods: HeaderValue,
    max_age: Option<Duration>,
}

impl CorsMiddleware {
    /// `*` for every origin, the common methods, requested headers reflected.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            origin: HeaderValue::from_static("*"),
            methods: HeaderValue::from_static(ALLOWED_METHODS),
            max_age: None,
        }
    }

    /// Lets browsers cache preflight answers for `max_age`.
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(headers::REQUEST_METHOD)
    }

    fn preflight(&self, request: &Request) -> Response {
        let mut response = response_with(StatusCode::NO_CONTENT, "", "");
        let out = response.headers_mut();
        out.insert(headers::ALLOW_ORIGIN, self.origin.clone());
        out.insert(headers::ALLOW_METHODS, self.methods.clone());
        if let Some(requested) = request.headers().get(headers::REQUEST_HEADERS) {
            out.insert(headers::ALLOW_HEADERS, requested.clone());
        }
        if let Some(max_age) = self.max_age {
            out.insert(headers::MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }
        response
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::permissive()
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            if Self::is_preflight(&request) {
                tracing::trace!(path = %request.uri().path(), "answering CORS preflight");
                return ctx.send(self.preflight(&request));
            }

            let result = next.run(ctx, request).await;
            if let Some(response) = ctx.response_mut() {
                response
                    .headers_mut()
                    .insert(headers::ALLOW_ORIGIN, self.origin.clone());
            }
            result
        })
    }
}
