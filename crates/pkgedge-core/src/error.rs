//! Error types for pkgedge.
//!
//! Expected outcomes such as malformed references, blacklisted packages or
//! missing files are not errors: collaborators report them as
//! [`Rejection`](crate::Rejection) values. [`EdgeError`] covers everything
//! else, and every `EdgeError` that escapes a stage is converted into an
//! opaque `500 Internal Server Error` by the error handler.
//!
//! | Variant | Raised by |
//! |---|---|
//! | `Stats` | Stats provider failures surfaced by the landing page |
//! | `Stage` | A pipeline stage or collaborator failing unexpectedly |
//! | `ResponseAlreadySent` | A second attempt to write a response |
//! | `FieldAlreadySet` | A stage overwriting context set by an earlier stage |
//! | `Io` | Filesystem access (templates, assets, mirror reads) |
//! | `Internal` | Anything else, with an optional wrapped cause |

use thiserror::Error;

/// Result type alias using [`EdgeError`].
pub type EdgeResult<T> = Result<T, EdgeError>;

/// Failures from a stats provider.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The upstream request could not be made or did not complete.
    #[error("stats request failed: {0}")]
    Request(String),

    /// The upstream answered with a non-success status.
    #[error("stats upstream returned status {0}")]
    Status(u16),

    /// The upstream body was not a usable JSON document.
    #[error("stats payload could not be decoded: {0}")]
    Decode(String),

    /// No provider is available.
    #[error("stats are unavailable: {0}")]
    Unavailable(String),
}

/// Unexpected failures while serving a request.
#[derive(Error, Debug)]
pub enum EdgeError {
    /// The stats provider failed while composing the landing page.
    #[error("failed to fetch edge statistics: {0}")]
    Stats(#[from] StatsError),

    /// A pipeline stage failed.
    #[error("{stage} stage failed: {message}")]
    Stage {
        /// Name of the failing stage.
        stage: &'static str,
        /// Human-readable failure description (server side only).
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A response was already written for this request.
    #[error("a response has already been sent for this request")]
    ResponseAlreadySent,

    /// A context field set by an earlier stage was written again.
    #[error("request context field `{0}` is already set")]
    FieldAlreadySet(&'static str),

    /// A required context field was not set by an earlier stage.
    #[error("request context field `{0}` is missing")]
    FieldMissing(&'static str),

    /// Filesystem or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other unexpected failure.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable failure description (server side only).
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl EdgeError {
    /// Creates a stage failure without an underlying cause.
    pub fn stage(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a stage failure wrapping an underlying cause.
    pub fn stage_with_source(
        stage: &'static str,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Stage {
            stage,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping an underlying cause.
    pub fn internal_with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns a short machine-readable kind, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Stats(_) => "stats",
            Self::Stage { .. } => "stage",
            Self::ResponseAlreadySent => "response_already_sent",
            Self::FieldAlreadySet(_) => "field_already_set",
            Self::FieldMissing(_) => "field_missing",
            Self::Io(_) => "io",
            Self::Internal { .. } => "internal",
        }
    }

    /// Renders the error and its full source chain on one line.
    ///
    /// This is what the error handler writes to the log; it is never
    /// sent to clients.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}
