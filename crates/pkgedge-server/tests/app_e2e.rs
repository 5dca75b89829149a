//! End-to-end tests for request routing.
//!
//! Requests go through the full admission chain (access log, request id,
//! CORS, error handler) and the router, using in-memory doubles for the
//! package collaborators and the stats provider.

use std::fs;
use std::sync::Arc;

use pkgedge_config::{AssetsConfig, EdgeConfig, PackagesConfig};
use pkgedge_core::fixtures::{FakeEmitter, FakeFetcher, FakeFilter, FakeResolver, FakeStats};
use pkgedge_middleware::Pipeline;
use pkgedge_server::landing::CACHE_TAG;
use pkgedge_server::{App, LandingPage, StaticFiles};
use pkgedge_test::TestClient;
use serde_json::json;
use tempfile::TempDir;

const TEMPLATE: &str =
    "<!doctype html><html><script>window.__DATA__ = __SERVER_DATA__</script></html>";

fn client_for(app: App) -> TestClient {
    let app = Arc::new(app);
    TestClient::new(move |request| {
        let app = Arc::clone(&app);
        async move { app.handle(request).await }
    })
}

fn package_pipeline(resolver: FakeResolver) -> Pipeline {
    Pipeline::package(
        resolver,
        FakeFilter::accept_all(),
        FakeFetcher::echo(),
        FakeEmitter::new(),
    )
}

fn assets_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.html"), TEMPLATE).unwrap();
    fs::write(dir.path().join("favicon.ico"), [0u8, 0, 1, 0]).unwrap();
    fs::create_dir_all(dir.path().join("_client")).unwrap();
    fs::write(dir.path().join("_client/main.js"), "main()").unwrap();
    dir
}

#[tokio::test]
async fn test_landing_page_substitutes_stats_once() {
    let stats = FakeStats::returning(json!({"totals": {"requests": 1234}}));
    let calls = stats.counter();
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, stats),
        package_pipeline(FakeResolver::new()),
    )
    .build();
    let client = client_for(app);

    let response = client.get("/").send().await;

    response
        .assert_status_code(200)
        .assert_header("cache-control", "public, max-age=60")
        .assert_header(CACHE_TAG, "home")
        .assert_header("content-type", "text/html; charset=utf-8");
    let body = response.text().unwrap();
    assert_eq!(body.matches("cloudflareStats").count(), 1);
    assert!(!body.contains("__SERVER_DATA__"));
    assert!(body.contains(r#"{"cloudflareStats":{"totals":{"requests":1234}}}"#));
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_landing_page_stats_failure_is_500() {
    let resolver = FakeResolver::new();
    let resolved = resolver.counter();
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, FakeStats::failing()),
        package_pipeline(resolver),
    )
    .build();
    let client = client_for(app);

    client
        .get("/")
        .send()
        .await
        .assert_status_code(500)
        .assert_header("content-type", "text/plain; charset=utf-8")
        .assert_body("Internal Server Error")
        .assert_no_header(CACHE_TAG)
        .assert_no_header("cache-control");
    assert_eq!(resolved.get(), 0);
}

#[tokio::test]
async fn test_static_assets_bypass_package_pipeline() {
    let dir = assets_dir();
    let resolver = FakeResolver::new();
    let filter = FakeFilter::accept_all();
    let fetcher = FakeFetcher::echo();
    let (resolved, filtered, fetched) = (resolver.counter(), filter.counter(), fetcher.counter());
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({}))),
        Pipeline::package(resolver, filter, fetcher, FakeEmitter::new()),
    )
    .assets(StaticFiles::new(dir.path()))
    .build();
    let client = client_for(app);

    client
        .get("/_client/main.js")
        .send()
        .await
        .assert_status_code(200)
        .assert_header("cache-control", "public, max-age=31536000")
        .assert_body("main()");
    client.head("/favicon.ico").send().await.assert_status_code(200);

    assert_eq!(resolved.get(), 0);
    assert_eq!(filtered.get(), 0);
    assert_eq!(fetched.get(), 0);

    // Anything else still reaches the pipeline.
    client
        .get("/react@18.2.0/index.js")
        .send()
        .await
        .assert_status_code(200)
        .assert_body("react@18.2.0/index.js");
    assert_eq!(resolved.get(), 1);
}

#[tokio::test]
async fn test_cors_header_on_every_response() {
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, FakeStats::failing()),
        package_pipeline(FakeResolver::new()),
    )
    .build();
    let client = client_for(app);

    for uri in ["/", "/react@18.2.0/index.js", "/"] {
        client
            .get(uri)
            .origin("https://example.com")
            .send()
            .await
            .assert_header("access-control-allow-origin", "*");
    }
    client
        .get("/lodash@4.17.21/lodash.js")
        .send()
        .await
        .assert_header("access-control-allow-origin", "*");
}

#[tokio::test]
async fn test_preflight_never_reaches_routes() {
    let stats = FakeStats::returning(json!({}));
    let resolver = FakeResolver::new();
    let (stats_calls, resolved) = (stats.counter(), resolver.counter());
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, stats),
        package_pipeline(resolver),
    )
    .build();
    let client = client_for(app);

    for uri in ["/", "/react@18.2.0/index.js"] {
        client
            .options(uri)
            .origin("https://example.com")
            .header("access-control-request-method", "GET")
            .send()
            .await
            .assert_status_code(204)
            .assert_header("access-control-allow-origin", "*")
            .assert_body("");
    }

    assert_eq!(stats_calls.get(), 0);
    assert_eq!(resolved.get(), 0);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({}))),
        package_pipeline(FakeResolver::new()),
    )
    .build();
    let client = client_for(app);

    client
        .get("/react@18.2.0/index.js")
        .header("x-request-id", "edge-router-42")
        .send()
        .await
        .assert_header("x-request-id", "edge-router-42");

    let generated = client.get("/react@18.2.0/index.js").send().await;
    let id = generated.header_str("x-request-id").unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_unanswered_request_falls_back_to_404() {
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({}))),
        Pipeline::builder().build(),
    )
    .build();
    let client = client_for(app);

    client
        .get("/anything")
        .send()
        .await
        .assert_status_code(404)
        .assert_body("Not Found")
        .assert_header("access-control-allow-origin", "*");
}

#[tokio::test]
async fn test_resolution_rejection_is_not_500() {
    let app = App::builder(
        LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({}))),
        package_pipeline(FakeResolver::new()),
    )
    .build();
    let client = client_for(app);

    let response = client.get("/").send().await;
    response.assert_status_code(200);

    client
        .post("/")
        .send()
        .await
        .assert_status_code(403)
        .assert_body("Invalid URL: /");
}

#[tokio::test]
async fn test_app_from_config_serves_mirror() {
    let assets = assets_dir();
    let mirror = TempDir::new().unwrap();
    let react = mirror.path().join("react/18.2.0");
    fs::create_dir_all(&react).unwrap();
    fs::write(react.join("package.json"), r#"{"main": "index.js"}"#).unwrap();
    fs::write(react.join("index.js"), "module.exports = React;\n").unwrap();
    fs::create_dir_all(mirror.path().join("evil-pkg/1.0.0")).unwrap();

    let config = EdgeConfig {
        assets: AssetsConfig {
            dir: assets.path().to_string_lossy().into_owned(),
            ..AssetsConfig::default()
        },
        packages: PackagesConfig {
            mirror_dir: mirror.path().to_string_lossy().into_owned(),
            blacklist: vec!["evil-pkg".to_string()],
            ..PackagesConfig::default()
        },
        ..EdgeConfig::default()
    };
    let client = client_for(App::from_config(&config).unwrap());

    client
        .get("/")
        .send()
        .await
        .assert_status_code(200)
        .assert_body_contains(r#"window.__DATA__ = {"cloudflareStats":{}}"#);

    client
        .get("/react@18.2.0/index.js")
        .send()
        .await
        .assert_status_code(200)
        .assert_header(CACHE_TAG, "file")
        .assert_header("cache-control", "public, max-age=31536000")
        .assert_body("module.exports = React;\n");

    client
        .get("/react@18.2.0")
        .send()
        .await
        .assert_redirect(302, "/react@18.2.0/index.js");

    client
        .get("/evil-pkg@1.0.0/index.js")
        .send()
        .await
        .assert_status_code(403)
        .assert_body("Package \"evil-pkg\" is blacklisted");

    client
        .get("/favicon.ico")
        .send()
        .await
        .assert_status_code(200)
        .assert_no_header(CACHE_TAG);
}

#[test]
fn test_app_from_config_requires_template() {
    let empty = TempDir::new().unwrap();
    let config = EdgeConfig {
        assets: AssetsConfig {
            dir: empty.path().to_string_lossy().into_owned(),
            ..AssetsConfig::default()
        },
        ..EdgeConfig::default()
    };
    let err = App::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("index.html"));
}
