//! Common types used throughout the middleware pipeline.

use http::{header, HeaderValue, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use pkgedge_core::types::text_response;
use pkgedge_core::Rejection;

pub use pkgedge_core::types::{Request, Response};

/// Body of every error-handler response.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Extension trait for building the pipeline's own responses.
pub trait ResponseExt {
    /// A plain-text response with the given status and message.
    fn text(status: StatusCode, message: &str) -> Response;

    /// The response for a collaborator's terminal rejection.
    fn rejection(rejection: &Rejection) -> Response;

    /// The opaque `500` written by the error handler.
    fn internal_error() -> Response;

    /// The response when nothing handled the request.
    fn not_found() -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, message: &str) -> Response {
        text_response(status, message.to_string())
    }

    fn rejection(rejection: &Rejection) -> Response {
        match rejection {
            Rejection::Redirect { location, .. } => {
                let location = encode_location(location);
                let mut response = text_response(
                    rejection.status_code(),
                    format!(
                        "{}. Redirecting to {location}",
                        rejection.status_code().canonical_reason().unwrap_or("Found")
                    ),
                );
                if let Ok(value) = HeaderValue::from_str(&location) {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                response
            }
            Rejection::Status { status, message } => text_response(*status, message.clone()),
        }
    }

    fn internal_error() -> Response {
        text_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
    }

    fn not_found() -> Response {
        text_response(StatusCode::NOT_FOUND, "Not Found")
    }
}

/// Bytes that may not appear unescaped in a URI. Reserved characters and
/// `%` stay as they are.
const LOCATION_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encodes bytes that cannot appear in a `Location` header.
///
/// The location is expected to be a path that was already valid before
/// decoding, so existing escapes are not encoded twice.
pub fn encode_location(location: &str) -> String {
    utf8_percent_encode(location, LOCATION_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let response = Response::text(StatusCode::FORBIDDEN, "Invalid URL: /%");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_redirect_response() {
        let response = Response::rejection(&Rejection::redirect("/react@18.2.0/index.js"));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/react@18.2.0/index.js"
        );
    }

    #[test]
    fn test_permanent_redirect_response() {
        let response = Response::rejection(&Rejection::permanent_redirect("/a b"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/a%20b");
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let response = Response::internal_error();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH).unwrap(),
            "21"
        );
    }

    #[test]
    fn test_encode_location() {
        assert_eq!(encode_location("/pkg@1.0.0/a b.js"), "/pkg@1.0.0/a%20b.js");
        assert_eq!(encode_location("/pkg@1.0.0/é"), "/pkg@1.0.0/%C3%A9");
        assert_eq!(encode_location("/pkg@1.0.0/a\"b<c>.js"), "/pkg@1.0.0/a%22b%3Cc%3E.js");
        assert_eq!(
            encode_location("/@scope/pkg@^1.0.0/a%20b.js?module&x=1"),
            "/@scope/pkg@%5E1.0.0/a%20b.js?module&x=1"
        );
    }
}
