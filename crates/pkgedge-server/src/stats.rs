//! Edge-network statistics providers.
//!
//! [`HttpStatsProvider`] fetches a JSON document from a configured URL on
//! every call; no caching or retries. [`StaticStatsProvider`] always
//! returns the same snapshot and is used when no URL is configured.

use std::time::Duration;

use pkgedge_config::StatsConfig;
use pkgedge_core::{BoxFuture, StatsError, StatsProvider, StatsSnapshot};
use reqwest::Client;

use crate::error::ServerError;

/// Fetches statistics over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatsProvider {
    client: Client,
    url: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpStatsProvider {
    /// Creates a provider for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::config(format!("failed to create stats client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            bearer_token: None,
            timeout,
        })
    }

    /// Builds a provider from the `stats` section, if a URL is set.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &StatsConfig) -> Result<Option<Self>, ServerError> {
        let Some(url) = &config.url else {
            return Ok(None);
        };
        let provider = Self::new(url.clone(), Duration::from_millis(config.timeout_ms))?;
        Ok(Some(match &config.bearer_token {
            Some(token) => provider.bearer_token(token.clone()),
            None => provider,
        }))
    }

    /// Sends `Authorization: Bearer <token>` with each request.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// The upstream URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self) -> Result<StatsSnapshot, StatsError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StatsError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::Status(status.as_u16()));
        }

        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| StatsError::Decode(e.to_string()))?;

        Ok(StatsSnapshot::new(value))
    }
}

impl StatsProvider for HttpStatsProvider {
    fn fetch_snapshot(&self) -> BoxFuture<'_, Result<StatsSnapshot, StatsError>> {
        Box::pin(self.fetch())
    }
}

/// Always returns the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticStatsProvider {
    snapshot: StatsSnapshot,
}

impl StaticStatsProvider {
    /// Creates a provider returning `snapshot`.
    #[must_use]
    pub const fn new(snapshot: StatsSnapshot) -> Self {
        Self { snapshot }
    }

    /// A provider returning an empty JSON object.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(StatsSnapshot::new(serde_json::json!({})))
    }
}

impl StatsProvider for StaticStatsProvider {
    fn fetch_snapshot(&self) -> BoxFuture<'_, Result<StatsSnapshot, StatsError>> {
        let snapshot = self.snapshot.clone();
        Box::pin(async move { Ok(snapshot) })
    }
}
