//! Error types for the pkgedge server.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while starting or running the server.
///
/// Request-level failures never show up here: they are [`EdgeError`]s
/// and are answered with a `500` by the error handler.
///
/// [`EdgeError`]: pkgedge_core::EdgeError
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the configured address.
    #[error("Bind error: {message}")]
    Bind {
        /// Error message.
        message: String,
    },

    /// The landing page template could not be read.
    #[error("Failed to load landing template {}: {source}", path.display())]
    Template {
        /// Path of the template.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A collaborator could not be constructed from the configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a bind error.
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
