//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why an [`EdgeConfig`](crate::EdgeConfig) could not be loaded.
///
/// Every variant is fatal at startup; the binary prints it and exits.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {} does not exist", path.display())]
    Missing {
        /// The requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file or string is neither TOML nor JSON.
    #[error("unsupported config format '{0}', expected toml or json")]
    UnsupportedFormat(String),

    /// TOML syntax or schema error.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or schema error.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file exists but could not be parsed.
    #[error("invalid .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A `PKGEDGE__*` override has a bad key or value.
    #[error("bad environment override {var}: {reason}")]
    Env {
        /// The variable name.
        var: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A loaded value failed validation.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted path of the field, e.g. `server.http_addr`.
        field: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// A validation failure for `field`.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
