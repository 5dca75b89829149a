//! Request routing.
//!
//! Every request passes the admission chain first, then one of three
//! routes:
//!
//! ```text
//! AccessLog → RequestId → Cors → ErrorHandler → Router
//!                                                 ├─ GET|HEAD /  → LandingPage
//!                                                 ├─ asset hit   → StaticFiles
//!                                                 └─ otherwise   → package Pipeline
//! ```
//!
//! A request that none of the routes answers gets `404 Not Found`. A
//! request whose body the server could not read is answered by the router
//! with the status in its `UnreadableBody` extension, so it still gets an
//! access log line, a request id and CORS headers.

use std::sync::Arc;

use http::{Method, StatusCode};
use pkgedge_config::EdgeConfig;
use pkgedge_core::{EdgeResult, StatsProvider};
use pkgedge_middleware::stages::{AccessLogMiddleware, CorsMiddleware, RequestIdMiddleware};
use pkgedge_middleware::{
    BoxFuture, ErrorHandler, Middleware, Next, Pipeline, Request, RequestContext, Response,
    ResponseExt,
};
use pkgedge_packages::{BlacklistFilter, FileEmitter, MirrorFetcher, PackagePathResolver};
use pkgedge_telemetry::AccessLogFormat;

use crate::error::ServerError;
use crate::landing::LandingPage;
use crate::static_files::StaticFiles;
use crate::stats::{HttpStatsProvider, StaticStatsProvider};

/// The complete request handler of the edge server.
///
/// `App` is cheap to share: wrap it in an `Arc` and call
/// [`handle`](Self::handle) from every connection.
pub struct App {
    chain: Pipeline,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("chain", &self.chain).finish()
    }
}

impl App {
    /// Starts building an app around a landing page and package pipeline.
    pub fn builder(landing: LandingPage, packages: Pipeline) -> AppBuilder {
        AppBuilder::new(landing, packages)
    }

    /// Builds the app and all default collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the landing template cannot be read or the
    /// stats client cannot be created.
    pub fn from_config(config: &EdgeConfig) -> Result<Self, ServerError> {
        let stats: Arc<dyn StatsProvider> = match HttpStatsProvider::from_config(&config.stats)? {
            Some(provider) => {
                tracing::info!(url = provider.url(), "using HTTP stats provider");
                Arc::new(provider)
            }
            None => {
                tracing::info!("no stats url configured, serving empty stats");
                Arc::new(StaticStatsProvider::empty())
            }
        };

        let landing =
            LandingPage::from_file(config.landing_template_path(), &config.landing, stats)?;

        let packages = Pipeline::package(
            PackagePathResolver::new(),
            BlacklistFilter::new(config.packages.blacklist.iter().cloned()),
            MirrorFetcher::new(config.packages.mirror_dir.clone()),
            FileEmitter::new(config.packages.max_age_secs),
        );

        let assets = StaticFiles::new(&config.assets.dir).max_age(config.assets.max_age_secs);

        Ok(Self::builder(landing, packages)
            .assets(assets)
            .access_log(config.access_log_format())
            .build())
    }

    /// Names of the admission stages, outermost first.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    /// Handles one request and returns its response.
    ///
    /// Never fails: errors become `500` responses inside the chain.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = RequestContext::from_request(&request);
        if let Err(error) = self.chain.process(&mut ctx, request).await {
            // Only reachable when an admission stage itself fails.
            ErrorHandler::new().handle(&mut ctx, &error);
        }
        ctx.take_response().unwrap_or_else(Response::internal_error)
    }
}

/// Builder for [`App`].
#[derive(Debug)]
pub struct AppBuilder {
    landing: LandingPage,
    packages: Pipeline,
    assets: Option<StaticFiles>,
    access_log: AccessLogFormat,
    cors: CorsMiddleware,
    request_id: RequestIdMiddleware,
}

impl AppBuilder {
    fn new(landing: LandingPage, packages: Pipeline) -> Self {
        Self {
            landing,
            packages,
            assets: None,
            access_log: AccessLogFormat::Off,
            cors: CorsMiddleware::permissive(),
            request_id: RequestIdMiddleware::new(),
        }
    }

    /// Serves pre-built assets ahead of the package pipeline.
    #[must_use]
    pub fn assets(mut self, assets: StaticFiles) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Access log format. Off unless set.
    #[must_use]
    pub const fn access_log(mut self, format: AccessLogFormat) -> Self {
        self.access_log = format;
        self
    }

    /// Replaces the default permissive CORS policy.
    #[must_use]
    pub fn cors(mut self, cors: CorsMiddleware) -> Self {
        self.cors = cors;
        self
    }

    /// Replaces the request id stage.
    #[must_use]
    pub fn request_id(mut self, request_id: RequestIdMiddleware) -> Self {
        self.request_id = request_id;
        self
    }

    /// Builds the app.
    pub fn build(self) -> App {
        let router = Router {
            landing: self.landing,
            assets: self.assets,
            packages: self.packages,
        };

        let chain = Pipeline::builder()
            .stage(AccessLogMiddleware::new(self.access_log))
            .stage(self.request_id)
            .stage(self.cors)
            .stage(ErrorHandler::new())
            .stage(router)
            .build();

        App { chain }
    }
}

/// Marks a request whose body was not read, with the status to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnreadableBody(pub(crate) StatusCode);

/// Terminal stage choosing between the landing page, assets and packages.
struct Router {
    landing: LandingPage,
    assets: Option<StaticFiles>,
    packages: Pipeline,
}

impl Router {
    fn is_landing(request: &Request) -> bool {
        request.uri().path() == "/"
            && (request.method() == Method::GET || request.method() == Method::HEAD)
    }
}

impl Middleware for Router {
    fn name(&self) -> &'static str {
        "router"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        _next: Next<'a>,
    ) -> BoxFuture<'a, EdgeResult<()>> {
        Box::pin(async move {
            if let Some(UnreadableBody(status)) =
                request.extensions().get::<UnreadableBody>().copied()
            {
                let reason = status.canonical_reason().unwrap_or("Bad Request");
                return ctx.send(Response::text(status, reason));
            }

            if Self::is_landing(&request) {
                let response = self.landing.respond(&request).await?;
                return ctx.send(response);
            }

            if let Some(assets) = &self.assets {
                if let Some(response) = assets.serve(&request).await? {
                    return ctx.send(response);
                }
            }

            self.packages.process(ctx, request).await?;

            if !ctx.response_sent() {
                ctx.send(Response::not_found())?;
            }
            Ok(())
        })
    }
}
