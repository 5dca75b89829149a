//! Diagnostic logging setup.
//!
//! One global `tracing` subscriber: pretty output while developing, JSON
//! lines in production, nothing under test. The access log target is
//! always kept at `info` so a quieter diagnostic level does not drop
//! access lines.
//!
//! ```rust,ignore
//! use pkgedge_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(addr = "0.0.0.0:8080", "listening");
//! ```

use crate::access::ACCESS_LOG_TARGET;
use crate::environment::Environment;
use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Install a subscriber at all.
    pub enabled: bool,

    /// Level or filter directives, e.g. `info` or `pkgedge=debug,hyper=warn`.
    /// `RUST_LOG` wins when set.
    pub level: String,

    /// JSON lines instead of pretty output.
    pub json: bool,

    /// Include file and line of the event.
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl LogConfig {
    /// Pretty output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json: false,
            source_location: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json: true,
            source_location: false,
        }
    }

    /// No subscriber.
    #[must_use]
    pub fn test() -> Self {
        Self {
            enabled: false,
            ..Self::development()
        }
    }

    /// The preset for `environment`.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Test => Self::test(),
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
        }
    }

    /// Filter directives with the access log target appended.
    ///
    /// An explicit directive for the access target in `level` is kept.
    #[must_use]
    pub fn directives(&self, env_override: Option<&str>) -> String {
        let base = env_override
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(self.level.as_str());
        if base.contains(ACCESS_LOG_TARGET) {
            base.to_string()
        } else {
            format!("{base},{ACCESS_LOG_TARGET}=info")
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directives do not parse or
/// a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let env = std::env::var("RUST_LOG").ok();
    let filter = EnvFilter::try_new(config.directives(env.as_deref()))
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log filter: {e}")))?;

    let fmt = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);
    let output: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        fmt.json().boxed()
    } else {
        fmt.pretty().boxed()
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
