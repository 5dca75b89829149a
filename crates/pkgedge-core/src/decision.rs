//! Policy decisions and terminal rejections.

use http::StatusCode;

/// A terminal response produced by a collaborator instead of continuing
/// the pipeline.
///
/// Rejections are expected outcomes (malformed URL, blacklisted package,
/// missing file, URL normalization) and never reach the error handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Redirect the client to another URL.
    Redirect {
        /// Target URL, sent as the `Location` header.
        location: String,
        /// `301` when permanent, `302` otherwise.
        permanent: bool,
    },
    /// Respond with a status and a short plain-text reason.
    Status {
        /// Client-facing status code (4xx or 5xx).
        status: StatusCode,
        /// Client-facing reason, sent as the body.
        message: String,
    },
}

impl Rejection {
    /// A temporary (`302`) redirect.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            permanent: false,
        }
    }

    /// A permanent (`301`) redirect.
    pub fn permanent_redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            permanent: true,
        }
    }

    /// A rejection with an arbitrary status.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// A `403 Forbidden` rejection.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::status(StatusCode::FORBIDDEN, message)
    }

    /// A `404 Not Found` rejection.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    /// The status code the rejection responds with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Redirect { permanent: true, .. } => StatusCode::MOVED_PERMANENTLY,
            Self::Redirect { permanent: false, .. } => StatusCode::FOUND,
            Self::Status { status, .. } => *status,
        }
    }

    /// Returns true for redirects.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Outcome of evaluating a reference against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The reference may be fetched.
    Accept,
    /// The reference must not be fetched; the rejection is written as-is.
    Reject(Rejection),
}

impl PolicyDecision {
    /// Returns true if the reference was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// The rejection, if the reference was rejected.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accept => None,
            Self::Reject(rejection) => Some(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(Rejection::redirect("/a").status_code(), StatusCode::FOUND);
        assert_eq!(
            Rejection::permanent_redirect("/a").status_code(),
            StatusCode::MOVED_PERMANENTLY
        );
        assert_eq!(Rejection::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Rejection::not_found("x").status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_policy_decision() {
        assert!(PolicyDecision::Accept.is_accepted());
        let decision = PolicyDecision::Reject(Rejection::forbidden("blacklisted"));
        assert!(!decision.is_accepted());
        assert!(decision.rejection().is_some());
    }
}
