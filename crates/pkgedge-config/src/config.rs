//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::{
    AssetsConfig, ConfigError, Environment, LandingConfig, LoggingConfig, PackagesConfig,
    ServerConfig, StatsConfig,
};
use pkgedge_telemetry::{AccessLogFormat, LogConfig};

/// Complete pkgedge configuration.
///
/// # Example
///
/// ```
/// use pkgedge_config::{EdgeConfig, Environment};
///
/// let config = EdgeConfig::default();
/// assert_eq!(config.environment, Environment::Development);
/// assert_eq!(config.assets.dir, "build");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct EdgeConfig {
    /// Deployment mode; selects the access-log format and logging defaults.
    #[serde(default)]
    pub environment: Environment,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Pre-built site assets.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Landing page.
    #[serde(default)]
    pub landing: LandingConfig,

    /// Edge statistics source.
    #[serde(default)]
    pub stats: StatsConfig,

    /// Package serving.
    #[serde(default)]
    pub packages: PackagesConfig,

    /// Diagnostic logging overrides.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EdgeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `server.http_addr` is not a socket address
    /// - `landing.placeholder` is empty
    /// - `stats.url` is set but not an http(s) URL
    /// - `stats.timeout_ms` is zero
    /// - a blacklist entry is blank
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.landing.placeholder.is_empty() {
            return Err(ConfigError::invalid(
                "landing.placeholder",
                "must not be empty",
            ));
        }

        if let Some(url) = &self.stats.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "stats.url",
                    format!("expected an http(s) URL, got {url}"),
                ));
            }
        }

        if self.stats.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "stats.timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.packages.blacklist.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "packages.blacklist",
                "entries must not be blank",
            ));
        }

        Ok(())
    }

    /// Diagnostic logging settings for this configuration.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let mut log = LogConfig::for_environment(self.environment);
        if let Some(level) = &self.logging.level {
            log.level.clone_from(level);
        }
        if let Some(json) = self.logging.json {
            log.json = json;
        }
        log
    }

    /// Access-log format for this configuration.
    #[must_use]
    pub const fn access_log_format(&self) -> AccessLogFormat {
        AccessLogFormat::for_environment(self.environment)
    }

    /// Path of the landing page template.
    #[must_use]
    pub fn landing_template_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.assets.dir).join(&self.assets.index_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EdgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_addr() {
        let mut config = EdgeConfig::default();
        config.server.http_addr = "not-an-addr".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "server.http_addr"
        ));
    }

    #[test]
    fn test_invalid_stats_url() {
        let mut config = EdgeConfig::default();
        config.stats.url = Some("ftp://stats".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_blacklist_entry() {
        let mut config = EdgeConfig::default();
        config.packages.blacklist = vec!["ok".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_config_follows_environment() {
        let mut config = EdgeConfig::default();
        config.environment = Environment::Production;
        assert!(config.log_config().json);

        config.logging.json = Some(false);
        config.logging.level = Some("warn".to_string());
        let log = config.log_config();
        assert!(!log.json);
        assert_eq!(log.level, "warn");
    }

    #[test]
    fn test_access_log_format() {
        let mut config = EdgeConfig::default();
        config.environment = Environment::Test;
        assert_eq!(config.access_log_format(), AccessLogFormat::Off);
    }

    #[test]
    fn test_landing_template_path() {
        let config = EdgeConfig::default();
        assert_eq!(
            config.landing_template_path(),
            std::path::Path::new("build/index.html")
        );
    }
}
