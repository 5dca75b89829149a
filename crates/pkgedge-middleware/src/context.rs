//! Per-request context.
//!
//! The [`RequestContext`] is created when a request is admitted, threaded
//! by `&mut` through every stage, and dropped once the response has been
//! handed to the connection. It is never shared between requests.
//!
//! Fields that the package pipeline produces (the resolved reference and
//! the fetch result) are write-once: a second write fails with
//! [`EdgeError::FieldAlreadySet`]. The response slot is write-once as
//! well, which is what guarantees a single response per request.

use crate::types::{Request, Response};
use http::{HeaderMap, Method};
use pkgedge_core::{EdgeError, EdgeResult, FetchResult, PackageReference, RequestId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// `CF-Ray` header set by the edge network.
pub const CF_RAY_HEADER: &str = "cf-ray";

/// `X-Forwarded-For` header.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Context that flows through the pipeline.
///
/// # Example
///
/// ```
/// use pkgedge_middleware::context::RequestContext;
/// use pkgedge_core::PackageReference;
///
/// let mut ctx = RequestContext::new();
/// ctx.set_reference(PackageReference::new("react", "18.2.0", "/index.js")).unwrap();
///
/// // The reference can't be replaced once set.
/// assert!(ctx.set_reference(PackageReference::new("vue", "3.0.0", "")).is_err());
/// assert_eq!(ctx.reference().unwrap().name(), "react");
/// ```
#[derive(Debug)]
pub struct RequestContext {
    /// Correlation identifier.
    request_id: RequestId,

    /// Request method.
    method: Method,

    /// Request target as received (path and query).
    url: String,

    /// `Host` header.
    host: Option<String>,

    /// `CF-Ray` header.
    cf_ray: Option<String>,

    /// `X-Forwarded-For`, raw.
    forwarded_for: Option<String>,

    /// When the request was admitted.
    started_at: Instant,

    /// Set by the resolve stage.
    reference: Option<PackageReference>,

    /// Set by the fetch stage.
    fetch_result: Option<FetchResult>,

    /// The single response for this request.
    response: Option<Response>,

    /// Whether a response has been sent (stays true after it is taken).
    sent: bool,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates an empty context for `GET /` with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            method: Method::GET,
            url: "/".to_string(),
            host: None,
            cf_ray: None,
            forwarded_for: None,
            started_at: Instant::now(),
            reference: None,
            fetch_result: None,
            response: None,
            sent: false,
            extensions: HashMap::new(),
        }
    }

    /// Creates a context from the metadata of `request`.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let headers = request.headers();
        let url = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path().to_string(), ToString::to_string);

        Self {
            method: request.method().clone(),
            url,
            host: header_string(headers, http::header::HOST.as_str())
                .or_else(|| request.uri().authority().map(ToString::to_string)),
            cf_ray: header_string(headers, CF_RAY_HEADER),
            forwarded_for: header_string(headers, FORWARDED_FOR_HEADER),
            ..Self::new()
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Sets the request ID.
    ///
    /// This should only be called by the request ID stage.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request target as received.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the `Host` header.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the `CF-Ray` header.
    #[must_use]
    pub fn cf_ray(&self) -> Option<&str> {
        self.cf_ray.as_deref()
    }

    /// Returns the raw `X-Forwarded-For` header.
    #[must_use]
    pub fn forwarded_for(&self) -> Option<&str> {
        self.forwarded_for.as_deref()
    }

    /// Returns when the request was admitted.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since admission.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the resolved package reference.
    #[must_use]
    pub fn reference(&self) -> Option<&PackageReference> {
        self.reference.as_ref()
    }

    /// Stores the resolved package reference.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::FieldAlreadySet` if a reference was already stored.
    pub fn set_reference(&mut self, reference: PackageReference) -> EdgeResult<()> {
        if self.reference.is_some() {
            return Err(EdgeError::FieldAlreadySet("reference"));
        }
        self.reference = Some(reference);
        Ok(())
    }

    /// Returns the fetch result.
    #[must_use]
    pub fn fetch_result(&self) -> Option<&FetchResult> {
        self.fetch_result.as_ref()
    }

    /// Stores the fetch result.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::FieldAlreadySet` if a result was already stored.
    pub fn set_fetch_result(&mut self, result: FetchResult) -> EdgeResult<()> {
        if self.fetch_result.is_some() {
            return Err(EdgeError::FieldAlreadySet("fetch_result"));
        }
        self.fetch_result = Some(result);
        Ok(())
    }

    /// Sends the response for this request.
    ///
    /// # Errors
    ///
    /// Returns `EdgeError::ResponseAlreadySent` if a response was already
    /// sent. The new response is discarded.
    pub fn send(&mut self, response: Response) -> EdgeResult<()> {
        if self.sent {
            return Err(EdgeError::ResponseAlreadySent);
        }
        self.sent = true;
        self.response = Some(response);
        Ok(())
    }

    /// Returns true once a response has been sent.
    #[must_use]
    pub fn response_sent(&self) -> bool {
        self.sent
    }

    /// Returns the sent response.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns the sent response for header decoration by admission stages.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Takes the sent response out of the context.
    ///
    /// The context still reports [`response_sent`](Self::response_sent),
    /// so nothing can be sent afterwards.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Stores a typed extension value.
    ///
    /// # Example
    ///
    /// ```
    /// use pkgedge_middleware::context::RequestContext;
    ///
    /// #[derive(Clone)]
    /// struct CacheHit(bool);
    ///
    /// let mut ctx = RequestContext::new();
    /// ctx.set_extension(CacheHit(true));
    /// assert!(ctx.get_extension::<CacheHit>().unwrap().0);
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}
