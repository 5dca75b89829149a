//! Test response wrapper.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use pkgedge_core::Response;
use serde::de::DeserializeOwned;

/// A fully collected response with assertion helpers.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects a pipeline response.
    pub async fn from_response(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status code as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// A header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION.as_str())
    }

    /// The raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// The body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    // Assertion methods

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status differs.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {} (body: {:?})",
            expected, self.status, self.body
        );
        self
    }

    /// Asserts the status code as a number.
    ///
    /// # Panics
    ///
    /// Panics if the status differs.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        match StatusCode::from_u16(expected) {
            Ok(status) => self.assert_status(status),
            Err(_) => panic!("{expected} is not a valid status code"),
        }
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));
        assert_eq!(
            actual, expected,
            "Header '{}': expected '{}', got '{}'",
            name, expected, actual
        );
        self
    }

    /// Asserts a header is absent.
    ///
    /// # Panics
    ///
    /// Panics if the header is present.
    pub fn assert_no_header(&self, name: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert!(
            self.header(name).is_none(),
            "Header '{}' should be absent, got {:?}",
            name,
            self.header(name)
        );
        self
    }

    /// Asserts the body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body differs.
    pub fn assert_body(&self, expected: impl AsRef<[u8]>) -> &Self {
        assert_eq!(
            self.body.as_ref(),
            expected.as_ref(),
            "Body mismatch: got {:?}",
            self.body
        );
        self
    }

    /// Asserts the body contains `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not UTF-8 or lacks the substring.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected),
            "Body should contain '{}', got: {}",
            expected,
            body
        );
        self
    }

    /// Asserts a redirect to `location` with the given status.
    ///
    /// # Panics
    ///
    /// Panics if the status or `Location` differs.
    pub fn assert_redirect(&self, status: u16, location: impl AsRef<str>) -> &Self {
        self.assert_status_code(status)
            .assert_header(header::LOCATION.as_str(), location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(header::LOCATION, HeaderValue::from_static("/react@18.2.0/index.js"));
        TestResponse::new(StatusCode::FOUND, headers, Bytes::from_static(b"{\"a\":1}"))
    }

    #[test]
    fn test_accessors() {
        let response = response();
        assert_eq!(response.status_code(), 302);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.location(), Some("/react@18.2.0/index.js"));
        assert_eq!(response.text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_json() {
        let value: serde_json::Value = response().json().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_assertions_chain() {
        response()
            .assert_redirect(302, "/react@18.2.0/index.js")
            .assert_no_header("etag")
            .assert_body_contains("\"a\"");
    }

    #[test]
    #[should_panic(expected = "Expected status 200 OK")]
    fn test_assert_status_panics() {
        response().assert_status(StatusCode::OK);
    }
}
