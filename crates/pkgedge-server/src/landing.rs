//! The landing page served at `/`.
//!
//! The HTML shell comes from the site build and contains a placeholder
//! token (`__SERVER_DATA__` by default). On every request the current
//! [`StatsSnapshot`] is fetched and serialized in place of the token as
//! `{"cloudflareStats": <snapshot>}`.
//!
//! The template is read once, when the page is constructed, and shared
//! read-only between requests afterwards. A stats failure is returned as
//! an error so the error handler answers `500`; a page without data is
//! never rendered.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use pkgedge_config::LandingConfig;
use pkgedge_core::types::response_with;
use pkgedge_core::{EdgeError, EdgeResult, Request, Response, StatsProvider, StatsSnapshot};

use crate::error::ServerError;

/// Default placeholder token in the HTML shell.
pub const DEFAULT_PLACEHOLDER: &str = "__SERVER_DATA__";

/// `Cache-Tag` response header.
pub const CACHE_TAG: &str = "cache-tag";

const HTML: &str = "text/html; charset=utf-8";

/// Renders the landing page.
#[derive(Clone)]
pub struct LandingPage {
    template: Arc<str>,
    placeholder: String,
    cache_control: String,
    cache_tag: String,
    stats: Arc<dyn StatsProvider>,
}

impl std::fmt::Debug for LandingPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandingPage")
            .field("template_len", &self.template.len())
            .field("placeholder", &self.placeholder)
            .field("cache_control", &self.cache_control)
            .field("cache_tag", &self.cache_tag)
            .finish_non_exhaustive()
    }
}

impl LandingPage {
    /// Creates a page from an in-memory template with default settings.
    pub fn from_template<S: StatsProvider>(template: impl Into<String>, stats: S) -> Self {
        Self::with_config(template.into(), &LandingConfig::default(), Arc::new(stats))
    }

    /// Reads the template at `path` and applies the `landing` settings.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Template` if the file cannot be read.
    pub fn from_file(
        path: impl AsRef<Path>,
        config: &LandingConfig,
        stats: Arc<dyn StatsProvider>,
    ) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let template = std::fs::read_to_string(path).map_err(|source| ServerError::Template {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = template.len(), "loaded landing template");
        Ok(Self::with_config(template, config, stats))
    }

    /// Creates a page from a template string and the `landing` settings.
    pub fn with_config(
        template: String,
        config: &LandingConfig,
        stats: Arc<dyn StatsProvider>,
    ) -> Self {
        if !template.contains(&config.placeholder) {
            tracing::warn!(
                placeholder = %config.placeholder,
                "landing template does not contain the data placeholder"
            );
        }

        Self {
            template: template.into(),
            placeholder: config.placeholder.clone(),
            cache_control: format!("public, max-age={}", config.max_age_secs),
            cache_tag: config.cache_tag.clone(),
            stats,
        }
    }

    /// The raw template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitutes the first placeholder occurrence with `snapshot`.
    ///
    /// `<` is escaped in the JSON so the payload can sit inside a
    /// `<script>` element.
    pub fn render(&self, snapshot: &StatsSnapshot) -> EdgeResult<String> {
        let mut data = serde_json::Map::new();
        data.insert("cloudflareStats".to_string(), snapshot.as_value().clone());
        let json = serde_json::to_string(&data)
            .map_err(|e| EdgeError::internal_with_source("failed to serialize landing data", e))?
            .replace('<', "\\u003c");
        Ok(self.template.replacen(&self.placeholder, &json, 1))
    }

    /// Fetches stats and builds the page response.
    ///
    /// `HEAD` gets the same headers without a body.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::Stats` if the stats provider fails.
    pub async fn respond(&self, request: &Request) -> EdgeResult<Response> {
        let snapshot = self.stats.fetch_snapshot().await?;
        let html = self.render(&snapshot)?;

        let mut response = if request.method() == Method::HEAD {
            let mut head = response_with(StatusCode::OK, HTML, Bytes::new());
            head.headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(html.len()));
            head
        } else {
            response_with(StatusCode::OK, HTML, html)
        };

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&self.cache_control) {
            headers.insert(header::CACHE_CONTROL, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.cache_tag) {
            headers.insert(CACHE_TAG, value);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use pkgedge_core::fixtures::FakeStats;
    use serde_json::json;

    const TEMPLATE: &str = "<html><script>window.DATA = __SERVER_DATA__</script></html>";

    fn get(method: Method) -> Request {
        http::Request::builder()
            .method(method)
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_render_substitutes_placeholder() {
        let page = LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({"hits": 3})));
        let html = page
            .render(&StatsSnapshot::new(json!({"hits": 3})))
            .unwrap();
        assert_eq!(
            html,
            r#"<html><script>window.DATA = {"cloudflareStats":{"hits":3}}</script></html>"#
        );
    }

    #[test]
    fn test_render_replaces_first_occurrence_only() {
        let page = LandingPage::from_template(
            "__SERVER_DATA__|__SERVER_DATA__",
            FakeStats::returning(json!(null)),
        );
        let html = page.render(&StatsSnapshot::new(json!(1))).unwrap();
        assert_eq!(html, r#"{"cloudflareStats":1}|__SERVER_DATA__"#);
    }

    #[test]
    fn test_render_escapes_script_close() {
        let page = LandingPage::from_template(TEMPLATE, FakeStats::returning(json!(null)));
        let html = page
            .render(&StatsSnapshot::new(json!({"x": "</script>"})))
            .unwrap();
        assert!(html.contains(r#"{"x":"\u003c/script>"}"#));
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[tokio::test]
    async fn test_respond_sets_cache_headers() {
        let page = LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({})));
        let response = page.respond(&get(Method::GET)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(response.headers()[CACHE_TAG], "home");
        assert_eq!(response.headers()[header::CONTENT_TYPE], HTML);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let page = LandingPage::from_template(TEMPLATE, FakeStats::returning(json!({})));
        let response = page.respond(&get(Method::HEAD)).await.unwrap();

        let expected = TEMPLATE.replace(DEFAULT_PLACEHOLDER, r#"{"cloudflareStats":{}}"#);
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            expected.len().to_string().as_str()
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_stats_failure_is_error() {
        let page = LandingPage::from_template(TEMPLATE, FakeStats::failing());
        let err = page.respond(&get(Method::GET)).await.unwrap_err();
        assert!(matches!(err, EdgeError::Stats(_)));
    }

    #[test]
    fn test_missing_template_file() {
        let err = LandingPage::from_file(
            "/nonexistent/index.html",
            &LandingConfig::default(),
            Arc::new(FakeStats::failing()),
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::Template { .. }));
    }

    #[test]
    fn test_template_loaded_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, TEMPLATE).unwrap();

        let page = LandingPage::from_file(
            &path,
            &LandingConfig::default(),
            Arc::new(FakeStats::returning(json!({}))),
        )
        .unwrap();
        assert_eq!(page.template(), TEMPLATE);
    }
}
