//! Request correlation identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest incoming request id that is adopted verbatim.
pub const MAX_REQUEST_ID_LEN: usize = 200;

/// A request correlation identifier.
///
/// Edge routers usually assign one and forward it as `X-Request-ID`; when
/// they don't, a UUID v7 is generated so that log lines stay correlatable.
///
/// # Example
///
/// ```
/// use pkgedge_core::RequestId;
///
/// let id = RequestId::from_header("f3b2c1d0-req").unwrap();
/// assert_eq!(id.as_str(), "f3b2c1d0-req");
/// assert!(RequestId::from_header("").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Adopts an incoming header value.
    ///
    /// Returns `None` for empty, oversized or non-printable values.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty()
            || value.len() > MAX_REQUEST_ID_LEN
            || !value.bytes().all(|b| b.is_ascii_graphic())
        {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_rejects_unprintable_header() {
        assert!(RequestId::from_header("has space").is_none());
        assert!(RequestId::from_header(&"x".repeat(MAX_REQUEST_ID_LEN + 1)).is_none());
    }
}
