//! End-to-end pipeline integration tests.
//!
//! These tests run the package pipeline with collaborator doubles and
//! check the ordering guarantees:
//!
//! 1. Resolve - path to reference
//! 2. Filter - blacklist policy
//! 3. Fetch - content retrieval
//! 4. Emit - response
//!
//! wrapped in the admission stages (access log, request id, CORS) and the
//! error handler, as the server wires them.

use bytes::Bytes;
use futures_util::future::join_all;
use http::{Request as HttpRequest, StatusCode};
use http_body_util::{BodyExt, Full};
use pkgedge_core::fixtures::{FakeEmitter, FakeFetcher, FakeFilter, FakeResolver};
use pkgedge_core::{EdgeResult, Rejection};
use pkgedge_middleware::{
    context::RequestContext,
    middleware::{BoxFuture, Middleware, Next},
    pipeline::{Pipeline, Stage},
    stages::{AccessLogMiddleware, CorsMiddleware, RequestIdMiddleware},
    types::{Request, INTERNAL_ERROR_BODY},
    ErrorHandler, HandledError,
};
use pkgedge_telemetry::{AccessLogFormat, AccessRecord};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn make_request(uri: &str) -> Request {
    HttpRequest::builder()
        .method("GET")
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Runs the package pipeline behind the error handler, the way the
/// server dispatches package requests.
async fn serve(pipeline: &Pipeline, uri: &str) -> (RequestContext, StatusCode, Bytes) {
    let request = make_request(uri);
    let mut ctx = RequestContext::from_request(&request);
    if let Err(error) = pipeline.process(&mut ctx, request).await {
        ErrorHandler::new().handle(&mut ctx, &error);
    }
    let response = ctx.take_response().expect("a response was sent");
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (ctx, status, body)
}

/// Terminal middleware that runs the package pipeline, like the server's
/// dispatch step.
struct Dispatch(Arc<Pipeline>);

impl Middleware for Dispatch {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        _next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move { self.0.process(ctx, request).await })
    }
}

#[test]
fn test_stage_ordering_verification() {
    let pipeline = Pipeline::package(
        FakeResolver::new(),
        FakeFilter::accept_all(),
        FakeFetcher::echo(),
        FakeEmitter::new(),
    );
    assert_eq!(
        pipeline.stage_names(),
        Stage::all().iter().map(|s| s.name()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_accepted_request_is_served_byte_for_byte() {
    let payload = Bytes::from_static(b"export default function React() {}\n");
    let pipeline = Pipeline::package(
        FakeResolver::new(),
        FakeFilter::accept_all(),
        FakeFetcher::with_body(payload.clone()),
        FakeEmitter::new(),
    );

    let (ctx, status, body) = serve(&pipeline, "/react@18.2.0/index.js").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, payload);
    assert_eq!(ctx.reference().unwrap().version(), "18.2.0");
    assert_eq!(ctx.fetch_result().unwrap().size(), payload.len());
}

#[tokio::test]
async fn test_blacklisted_package_is_never_fetched() {
    let fetcher = FakeFetcher::echo();
    let emitter = FakeEmitter::new();
    let fetched = fetcher.counter();
    let emitted = emitter.counter();
    let pipeline = Pipeline::package(
        FakeResolver::new(),
        FakeFilter::deny(["evil-pkg"]),
        fetcher,
        emitter,
    );

    let (_, status, body) = serve(&pipeline, "/evil-pkg@1.0.0/index.js").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Package \"evil-pkg\" is blacklisted");
    assert_eq!(fetched.get(), 0);
    assert_eq!(emitted.get(), 0);
}

#[tokio::test]
async fn test_malformed_path_skips_later_stages() {
    let filter = FakeFilter::accept_all();
    let fetcher = FakeFetcher::echo();
    let filtered = filter.counter();
    let fetched = fetcher.counter();
    let pipeline = Pipeline::package(
        FakeResolver::rejecting(Rejection::forbidden("Invalid URL: /%%%")),
        filter,
        fetcher,
        FakeEmitter::new(),
    );

    let (ctx, status, body) = serve(&pipeline, "/%25%25%25").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid URL: /%%%");
    assert!(ctx.reference().is_none());
    assert!(ctx.get_extension::<HandledError>().is_none());
    assert_eq!(filtered.get(), 0);
    assert_eq!(fetched.get(), 0);
}

#[tokio::test]
async fn test_redirect_rejection_sets_location() {
    let pipeline = Pipeline::package(
        FakeResolver::new(),
        FakeFilter::accept_all(),
        FakeFetcher::rejecting(Rejection::redirect("/react@18.2.0/index.js")),
        FakeEmitter::new(),
    );

    let request = make_request("/react");
    let mut ctx = RequestContext::from_request(&request);
    pipeline.process(&mut ctx, request).await.unwrap();

    let response = ctx.response().unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(http::header::LOCATION).unwrap(),
        "/react@18.2.0/index.js"
    );
    assert!(ctx.fetch_result().is_none());
}

#[tokio::test]
async fn test_fetch_failure_becomes_opaque_500() {
    let emitter = FakeEmitter::new();
    let emitted = emitter.counter();
    let pipeline = Pipeline::package(
        FakeResolver::new(),
        FakeFilter::accept_all(),
        FakeFetcher::failing(),
        emitter,
    );

    let (ctx, status, body) = serve(&pipeline, "/react@18.2.0/index.js").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, INTERNAL_ERROR_BODY);
    assert_eq!(emitted.get(), 0);
    assert_eq!(ctx.get_extension::<HandledError>().unwrap().kind, "stage");
}

#[tokio::test]
async fn test_emit_failure_sends_single_response() {
    let pipeline = Pipeline::package(
        FakeResolver::new(),
        FakeFilter::accept_all(),
        FakeFetcher::echo(),
        FakeEmitter::failing(),
    );

    let (ctx, status, _) = serve(&pipeline, "/react@18.2.0/index.js").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(ctx.response_sent());
    assert!(ctx.get_extension::<HandledError>().unwrap().responded);
}

#[tokio::test]
async fn test_admission_chain_wraps_package_pipeline() {
    let package = Arc::new(Pipeline::package(
        FakeResolver::new(),
        FakeFilter::accept_all(),
        FakeFetcher::failing(),
        FakeEmitter::new(),
    ));
    let admission = Pipeline::builder()
        .stage(AccessLogMiddleware::new(AccessLogFormat::Off))
        .stage(RequestIdMiddleware::new())
        .stage(CorsMiddleware::permissive())
        .stage(ErrorHandler::new())
        .stage(Dispatch(package))
        .build();

    let request = HttpRequest::builder()
        .uri("/react@18.2.0/index.js")
        .header("x-request-id", "req-42")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let mut ctx = RequestContext::from_request(&request);
    admission.process(&mut ctx, request).await.unwrap();

    let response = ctx.response().unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );

    let record = ctx.get_extension::<AccessRecord>().unwrap();
    assert_eq!(record.status, 500);
    assert_eq!(record.request_id.as_deref(), Some("req-42"));
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_state() {
    let resolver = FakeResolver::new().with_delay(Duration::from_millis(5));
    let fetcher = FakeFetcher::echo().with_delay(Duration::from_millis(3));
    let resolved = resolver.counter();
    let pipeline = Pipeline::package(resolver, FakeFilter::accept_all(), fetcher, FakeEmitter::new());

    let uris: Vec<String> = (0..16).map(|i| format!("/pkg-{i}@1.0.{i}/file-{i}.js")).collect();
    let results = join_all(uris.iter().map(|uri| serve(&pipeline, uri))).await;

    for (i, (ctx, status, body)) in results.into_iter().enumerate() {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("pkg-{i}@1.0.{i}/file-{i}.js"));
        assert_eq!(ctx.reference().unwrap().name(), format!("pkg-{i}"));
    }
    assert_eq!(resolved.get(), 16);
}

proptest! {
    #[test]
    fn prop_denied_names_never_reach_fetch(name in "[a-z][a-z0-9-]{0,20}", deny in any::<bool>()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let fetcher = FakeFetcher::echo();
        let fetched = fetcher.counter();
        let filter = if deny {
            FakeFilter::deny([name.clone()])
        } else {
            FakeFilter::accept_all()
        };
        let pipeline = Pipeline::package(FakeResolver::new(), filter, fetcher, FakeEmitter::new());

        let (_, status, _) = runtime.block_on(serve(&pipeline, &format!("/{name}@1.0.0/index.js")));

        if deny {
            prop_assert_eq!(status, StatusCode::FORBIDDEN);
            prop_assert_eq!(fetched.get(), 0);
        } else {
            prop_assert_eq!(status, StatusCode::OK);
            prop_assert_eq!(fetched.get(), 1);
        }
    }
}
