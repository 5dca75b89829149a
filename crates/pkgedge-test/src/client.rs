//! Test client for in-memory HTTP testing.

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use bytes::Bytes;
use http::{Method, StatusCode};
use pkgedge_core::types::text_response;
use pkgedge_core::{Request, Response};
use pkgedge_middleware::{ErrorHandler, Pipeline, RequestContext, ResponseExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Handler function type for the test client.
pub type TestHandler =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// Sends requests to a handler without a network connection.
///
/// ```
/// use http::StatusCode;
/// use pkgedge_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let client = TestClient::fixed_response(StatusCode::OK, "ok");
/// client.get("/").send().await.assert_body("ok");
/// # });
/// ```
#[must_use]
pub struct TestClient {
    handler: TestHandler,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client around an async handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |request| Box::pin(handler(request))),
            default_headers: Vec::new(),
        }
    }

    /// Creates a client that runs `pipeline` behind the error handler.
    ///
    /// Requests the pipeline leaves unanswered get `404 Not Found`.
    pub fn pipeline(pipeline: Pipeline) -> Self {
        let pipeline = Arc::new(pipeline);
        Self::new(move |request| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let mut ctx = RequestContext::from_request(&request);
                if let Err(error) = pipeline.process(&mut ctx, request).await {
                    ErrorHandler::new().handle(&mut ctx, &error);
                }
                ctx.take_response().unwrap_or_else(Response::not_found)
            }
        })
    }

    /// Creates a client that always answers with `status` and `body`.
    pub fn fixed_response(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(move |_request| {
            let body = body.clone();
            async move { text_response(status, body) }
        })
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::head(uri))
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::options(uri))
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    async fn send_internal(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let handler = Arc::clone(&self.handler);
        let response = (handler)(request.into_request()).await;
        TestResponse::from_response(response).await
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let mut builder = builder;
        for (name, value) in &client.default_headers {
            builder = builder.header(name, value);
        }
        Self { client, builder }
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the `Origin` header.
    pub fn origin(mut self, origin: impl AsRef<str>) -> Self {
        self.builder = self.builder.origin(origin);
        self
    }

    /// Sets the `If-None-Match` header.
    pub fn if_none_match(mut self, etag: impl AsRef<str>) -> Self {
        self.builder = self.builder.if_none_match(etag);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built; use [`try_send`](Self::try_send)
    /// to handle that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build or body errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send_internal(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgedge_core::fixtures::{FakeEmitter, FakeFetcher, FakeFilter, FakeResolver};
    use pkgedge_core::Rejection;

    fn package_client(resolver: FakeResolver, fetcher: FakeFetcher) -> TestClient {
        TestClient::pipeline(Pipeline::package(
            resolver,
            FakeFilter::accept_all(),
            fetcher,
            FakeEmitter::new(),
        ))
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let client = TestClient::fixed_response(StatusCode::CREATED, "created");
        client
            .post("/items")
            .send()
            .await
            .assert_status_code(201)
            .assert_body("created");
    }

    #[tokio::test]
    async fn test_default_headers_are_sent() {
        let client = TestClient::new(|request: Request| async move {
            let id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none")
                .to_string();
            text_response(StatusCode::OK, id)
        })
        .with_default_header("x-request-id", "req-7");

        client.get("/").send().await.assert_body("req-7");
    }

    #[tokio::test]
    async fn test_pipeline_success() {
        let client = package_client(FakeResolver::new(), FakeFetcher::echo());
        client
            .get("/pkg-0@1.0.0/file-0.js")
            .send()
            .await
            .assert_status(StatusCode::OK)
            .assert_body("pkg-0@1.0.0/file-0.js");
    }

    #[tokio::test]
    async fn test_pipeline_redirect() {
        let client = package_client(
            FakeResolver::rejecting(Rejection::redirect("/react@18.2.0/index.js")),
            FakeFetcher::echo(),
        );
        client
            .get("/react/index.js")
            .send()
            .await
            .assert_redirect(302, "/react@18.2.0/index.js");
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_opaque_500() {
        let client = package_client(FakeResolver::new(), FakeFetcher::failing());
        client
            .get("/react@18.2.0/index.js")
            .send()
            .await
            .assert_status_code(500)
            .assert_body("Internal Server Error");
    }

    #[tokio::test]
    async fn test_invalid_header_surfaces_from_try_send() {
        let client = TestClient::fixed_response(StatusCode::OK, "ok");
        let err = client
            .get("/")
            .header("x-bad", "line\nbreak")
            .try_send()
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }
}
