//! Configuration schema types.
//!
//! Every section can be omitted; missing fields fall back to the
//! `default_*` functions at the bottom of this module.

use serde::{Deserialize, Serialize};

/// HTTP server section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// How long in-flight connections may drain after a shutdown signal.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum time to wait for a request body.
    #[serde(default = "default_body_timeout")]
    pub body_timeout_ms: u64,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            body_timeout_ms: default_body_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Pre-built site assets section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
    /// Directory holding the built site.
    #[serde(default = "default_assets_dir")]
    pub dir: String,

    /// Landing page template, relative to `dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// `max-age` for asset responses, in seconds.
    #[serde(default = "default_one_year")]
    pub max_age_secs: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            index_file: default_index_file(),
            max_age_secs: default_one_year(),
        }
    }
}

/// Landing page section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LandingConfig {
    /// Token in the template replaced with the server data JSON.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// `max-age` for the landing page, in seconds.
    #[serde(default = "default_landing_max_age")]
    pub max_age_secs: u64,

    /// `Cache-Tag` value for the landing page.
    #[serde(default = "default_landing_cache_tag")]
    pub cache_tag: String,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            max_age_secs: default_landing_max_age(),
            cache_tag: default_landing_cache_tag(),
        }
    }
}

/// Edge statistics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatsConfig {
    /// Statistics endpoint. When unset, an empty snapshot is served.
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout for the statistics endpoint.
    #[serde(default = "default_stats_timeout")]
    pub timeout_ms: u64,

    /// Bearer token sent to the statistics endpoint.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_stats_timeout(),
            bearer_token: None,
        }
    }
}

/// Package serving section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackagesConfig {
    /// Root of the on-disk package mirror.
    #[serde(default = "default_mirror_dir")]
    pub mirror_dir: String,

    /// Package names that are never served.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// `max-age` for package file responses, in seconds.
    #[serde(default = "default_one_year")]
    pub max_age_secs: u64,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            mirror_dir: default_mirror_dir(),
            blacklist: Vec::new(),
            max_age_secs: default_one_year(),
        }
    }
}

/// Diagnostic logging section.
///
/// Unset fields take the defaults of the configured environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level or filter directive.
    #[serde(default)]
    pub level: Option<String>,

    /// JSON output instead of pretty text.
    #[serde(default)]
    pub json: Option<bool>,
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

const fn default_shutdown_timeout() -> u64 {
    30
}

const fn default_body_timeout() -> u64 {
    10_000
}

const fn default_max_body_bytes() -> u64 {
    64 * 1024
}

fn default_assets_dir() -> String {
    "build".to_string()
}

fn default_index_file() -> String {
    "index.html".to_string()
}

const fn default_one_year() -> u64 {
    365 * 24 * 60 * 60
}

fn default_placeholder() -> String {
    "__SERVER_DATA__".to_string()
}

const fn default_landing_max_age() -> u64 {
    60
}

fn default_landing_cache_tag() -> String {
    "home".to_string()
}

const fn default_stats_timeout() -> u64 {
    5_000
}

fn default_mirror_dir() -> String {
    "packages".to_string()
}
