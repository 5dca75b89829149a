//! Access log records.
//!
//! One [`AccessRecord`] is built per request once the response is known.
//! How it is rendered depends on the [`AccessLogFormat`]:
//!
//! | Environment | Format |
//! |---|---|
//! | `test` | nothing is written |
//! | `development` | `GET /react@18.2.0/index.js 200 3.105 ms - 6541` |
//! | `production` | `method=GET path="/react@18.2.0/index.js" host=cdn.example request_id=... cf_ray=... fwd=1.2.3.4,10.0.0.1 status=200 bytes=6541` |
//!
//! The production format follows the Heroku router log layout so that log
//! drains can parse it as `key=value` pairs. Missing values render as `-`.

use crate::environment::Environment;
use std::fmt::Write as _;
use std::time::Duration;

/// `tracing` target of access log events.
pub const ACCESS_LOG_TARGET: &str = "pkgedge::access";

const MISSING: &str = "-";

/// Access log layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLogFormat {
    /// No access log.
    Off,
    /// Short human-readable line.
    Development,
    /// `key=value` line for log drains.
    Production,
}

impl AccessLogFormat {
    /// The format used in `environment`.
    #[must_use]
    pub const fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Test => Self::Off,
            Environment::Development => Self::Development,
            Environment::Production => Self::Production,
        }
    }
}

/// Request and response metadata for one access log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    /// HTTP method.
    pub method: String,
    /// Request target as received (path and query).
    pub url: String,
    /// `Host` header.
    pub host: Option<String>,
    /// Request correlation id.
    pub request_id: Option<String>,
    /// `CF-Ray` header set by the edge network.
    pub cf_ray: Option<String>,
    /// `X-Forwarded-For` with all whitespace removed.
    pub forwarded_for: Option<String>,
    /// Response status code.
    pub status: u16,
    /// Response `Content-Length`, if known.
    pub bytes: Option<u64>,
    /// Time from admission to response.
    pub elapsed: Duration,
}

impl AccessRecord {
    /// Removes all whitespace from a forwarding chain.
    ///
    /// ```
    /// use pkgedge_telemetry::AccessRecord;
    ///
    /// assert_eq!(AccessRecord::normalize_forwarded(" 1.2.3.4, 10.0.0.1 "), "1.2.3.4,10.0.0.1");
    /// ```
    #[must_use]
    pub fn normalize_forwarded(raw: &str) -> String {
        raw.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Renders the production line.
    #[must_use]
    pub fn production_line(&self) -> String {
        let mut line = String::with_capacity(160);
        let _ = write!(
            line,
            "method={} path=\"{}\" host={} request_id={} cf_ray={} fwd={} status={} bytes={}",
            self.method,
            self.url,
            or_missing(self.host.as_deref()),
            or_missing(self.request_id.as_deref()),
            or_missing(self.cf_ray.as_deref()),
            or_missing(self.forwarded_for.as_deref()),
            self.status,
            self.bytes_text(),
        );
        line
    }

    /// Renders the development line.
    #[must_use]
    pub fn development_line(&self) -> String {
        format!(
            "{} {} {} {:.3} ms - {}",
            self.method,
            self.url,
            self.status,
            self.elapsed.as_secs_f64() * 1000.0,
            self.bytes_text(),
        )
    }

    /// Renders the line for `format`, or `None` when access logging is off.
    #[must_use]
    pub fn line(&self, format: AccessLogFormat) -> Option<String> {
        match format {
            AccessLogFormat::Off => None,
            AccessLogFormat::Development => Some(self.development_line()),
            AccessLogFormat::Production => Some(self.production_line()),
        }
    }

    /// Writes the record as one `tracing` event and returns the line.
    pub fn emit(&self, format: AccessLogFormat) -> Option<String> {
        let line = self.line(format)?;
        tracing::info!(
            target: ACCESS_LOG_TARGET,
            request_id = self.request_id.as_deref().unwrap_or(MISSING),
            http.method = %self.method,
            http.status_code = self.status,
            duration_ms = self.elapsed.as_secs_f64() * 1000.0,
            "{line}"
        );
        Some(line)
    }

    fn bytes_text(&self) -> String {
        self.bytes
            .map_or_else(|| MISSING.to_string(), |bytes| bytes.to_string())
    }
}

fn or_missing(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AccessRecord {
        AccessRecord {
            method: "GET".to_string(),
            url: "/react@18.2.0/index.js?meta".to_string(),
            host: Some("cdn.example".to_string()),
            request_id: Some("req-1".to_string()),
            cf_ray: Some("8a1b2c3d4e5f-SJC".to_string()),
            forwarded_for: Some(AccessRecord::normalize_forwarded("1.2.3.4, 10.0.0.1")),
            status: 200,
            bytes: Some(6541),
            elapsed: Duration::from_micros(3105),
        }
    }

    #[test]
    fn test_production_line() {
        assert_eq!(
            record().production_line(),
            "method=GET path=\"/react@18.2.0/index.js?meta\" host=cdn.example request_id=req-1 \
             cf_ray=8a1b2c3d4e5f-SJC fwd=1.2.3.4,10.0.0.1 status=200 bytes=6541"
        );
    }

    #[test]
    fn test_production_line_missing_values() {
        let record = AccessRecord {
            host: None,
            cf_ray: None,
            forwarded_for: None,
            bytes: None,
            ..record()
        };
        let line = record.production_line();
        assert!(line.contains("host=- "));
        assert!(line.contains("cf_ray=- fwd=- "));
        assert!(line.ends_with("bytes=-"));
    }

    #[test]
    fn test_development_line() {
        assert_eq!(
            record().development_line(),
            "GET /react@18.2.0/index.js?meta 200 3.105 ms - 6541"
        );
    }

    #[test]
    fn test_test_environment_is_silent() {
        let format = AccessLogFormat::for_environment(Environment::Test);
        assert_eq!(record().emit(format), None);
    }
}
