//! Edge-network statistics.

use serde::{Deserialize, Serialize};

/// Opaque statistics payload from a [`StatsProvider`](crate::StatsProvider).
///
/// No structure is enforced; the landing page embeds it verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsSnapshot(serde_json::Value);

impl StatsSnapshot {
    /// Wraps a JSON value.
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Returns the wrapped value.
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consumes the snapshot, returning the wrapped value.
    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for StatsSnapshot {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_transparently() {
        let snapshot = StatsSnapshot::new(serde_json::json!({"requests": 42}));
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), r#"{"requests":42}"#);
    }
}
