//! HTTP request and response types shared across the pipeline.

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type seen by every stage and collaborator.
///
/// Bodies are collected before the request enters the pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by stages and collaborators.
pub type Response = http::Response<Full<Bytes>>;

/// Builds a response with the given status, content type and body.
///
/// `Content-Length` is always set, so access logging can report the
/// payload size. An empty content type, or one that is not valid header
/// text, leaves `Content-Type` unset.
pub fn response_with(status: http::StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response {
    let body = body.into();
    let length = body.len();
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if !content_type.is_empty() {
        if let Ok(value) = http::HeaderValue::from_str(content_type) {
            headers.insert(http::header::CONTENT_TYPE, value);
        }
    }
    headers.insert(http::header::CONTENT_LENGTH, http::HeaderValue::from(length));
    response
}

/// Returns the `Content-Length` header of `response`, if present and valid.
pub fn content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Builds a `text/plain` response.
pub fn text_response(status: http::StatusCode, body: impl Into<Bytes>) -> Response {
    response_with(status, "text/plain; charset=utf-8", body)
}
