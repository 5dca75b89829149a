//! File responses.

use crate::integrity::etag;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use http::{header, HeaderValue, Method, StatusCode};
use pkgedge_core::types::response_with;
use pkgedge_core::{BoxFuture, EdgeError, FetchResult, PackageReference, Request, Response, ResponseEmitter};
use serde::Serialize;

/// Default file cache lifetime: one year.
pub const DEFAULT_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// `Cache-Tag` of file responses.
pub const FILE_CACHE_TAG: &str = "file";

/// `Cache-Tag` of metadata responses.
pub const META_CACHE_TAG: &str = "meta";

const CACHE_TAG: &str = "cache-tag";

/// Metadata document served for `?meta` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// File path inside the package.
    pub path: String,
    /// Always `file`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Content type the file is served with.
    pub content_type: String,
    /// `sha1-<base64>` digest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// Size in bytes.
    pub size: usize,
    /// Modification time, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl FileMetadata {
    /// Builds the metadata for `result`.
    #[must_use]
    pub fn from_result(result: &FetchResult) -> Self {
        Self {
            path: result.path().to_string(),
            kind: "file",
            content_type: result.content_type().to_string(),
            integrity: result.integrity().map(String::from),
            size: result.size(),
            last_modified: result.last_modified().map(|time| {
                DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
            }),
        }
    }
}

/// Writes fetched files as HTTP responses.
///
/// - `200` with the payload, content type, length, validators and a
///   public cache lifetime
/// - `304` when `If-None-Match` matches the integrity ETag
/// - `HEAD` gets the headers of the `200` without the body
/// - `?meta` gets a JSON [`FileMetadata`] document instead of the file
#[derive(Debug, Clone)]
pub struct FileEmitter {
    cache_control: HeaderValue,
}

impl Default for FileEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE_SECS)
    }
}

impl FileEmitter {
    /// Creates an emitter with `max-age=<max_age_secs>`.
    #[must_use]
    pub fn new(max_age_secs: u64) -> Self {
        let cache_control = HeaderValue::from_str(&format!("public, max-age={max_age_secs}"))
            .unwrap_or_else(|_| HeaderValue::from_static("public"));
        Self { cache_control }
    }

    /// The `Cache-Control` value of every response.
    #[must_use]
    pub const fn cache_control(&self) -> &HeaderValue {
        &self.cache_control
    }

    /// Builds the response for `result`.
    pub fn respond(
        &self,
        request: &Request,
        reference: &PackageReference,
        result: &FetchResult,
    ) -> Result<Response, EdgeError> {
        if reference.flags().meta {
            return self.metadata_response(request, result);
        }

        let etag = result.integrity().map(etag);
        if let Some(etag) = etag.as_deref() {
            if if_none_match(request, etag) {
                return Ok(self.not_modified(etag));
            }
        }

        let body = if request.method() == Method::HEAD {
            Bytes::new()
        } else {
            result.body().clone()
        };
        let mut response = response_with(StatusCode::OK, result.content_type(), body);

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(result.size()));
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
        headers.insert(CACHE_TAG, HeaderValue::from_static(FILE_CACHE_TAG));
        if let Some(value) = etag.and_then(|etag| HeaderValue::from_str(&etag).ok()) {
            headers.insert(header::ETAG, value);
        }
        if let Some(modified) = result.last_modified() {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
                headers.insert(header::LAST_MODIFIED, value);
            }
        }

        Ok(response)
    }

    fn metadata_response(&self, request: &Request, result: &FetchResult) -> Result<Response, EdgeError> {
        let metadata = FileMetadata::from_result(result);
        let json = serde_json::to_vec(&metadata)
            .map_err(|e| EdgeError::stage_with_source("emit", "failed to encode metadata", e))?;
        let length = json.len();

        let body = if request.method() == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(json)
        };
        let mut response = response_with(StatusCode::OK, "application/json; charset=utf-8", body);

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
        headers.insert(CACHE_TAG, HeaderValue::from_static(META_CACHE_TAG));
        Ok(response)
    }

    fn not_modified(&self, etag: &str) -> Response {
        let mut response = response_with(StatusCode::NOT_MODIFIED, "", Bytes::new());
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::CONTENT_TYPE);
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(header::ETAG, value);
        }
        response
    }
}

impl ResponseEmitter for FileEmitter {
    fn emit<'a>(
        &'a self,
        request: &'a Request,
        reference: &'a PackageReference,
        result: &'a FetchResult,
    ) -> BoxFuture<'a, Result<Response, EdgeError>> {
        Box::pin(async move { self.respond(request, reference, result) })
    }
}

fn if_none_match(request: &Request, etag: &str) -> bool {
    request
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .map(|tag| tag.trim().trim_start_matches("W/"))
                .any(|tag| tag == etag || tag == "*")
        })
}
