//! Per-request context handed to middlewares, handlers and response filters.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::request::Request;
use crate::upload::UploadedFile;

/// Everything one request's middlewares and handler share.
///
/// Cloning is cheap and every clone refers to the same request: a user set by
/// an authentication middleware is visible to the handler, headers added by the
/// handler end up on the response.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

struct Inner {
    request: Request,
    request_id: String,
    span: tracing::Span,
    user: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
    response_headers: Mutex<HeaderMap>,
}

impl RequestContext {
    pub(crate) fn new(request: Request, request_id: String, span: tracing::Span) -> Self {
        Self {
            inner: Arc::new(Inner {
                request,
                request_id,
                span,
                user: Mutex::new(None),
                response_headers: Mutex::new(HeaderMap::new()),
            }),
        }
    }

    /// The validated request.
    pub fn req(&self) -> &Request {
        &self.inner.request
    }

    /// Identifier generated for this request, also sent back as `x-request-id`.
    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    /// The request's tracing span. Events emitted while the pipeline runs are
    /// already recorded inside it; use this to enter it from spawned work.
    pub fn logger(&self) -> &tracing::Span {
        &self.inner.span
    }

    /// The authenticated user, if a middleware stored one of type `U`.
    pub fn user<U: Any + Send + Sync>(&self) -> Option<Arc<U>> {
        let slot = self.inner.user.lock().unwrap_or_else(PoisonError::into_inner);
        slot.clone().and_then(|user| user.downcast::<U>().ok())
    }

    pub fn set_user<U: Any + Send + Sync>(&self, user: U) {
        let mut slot = self.inner.user.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(user));
    }

    /// First file uploaded under `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.inner.request.files.iter().find(|f| f.field == field)
    }

    /// Sets a header on the eventual response, success or error.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        let mut headers = self.inner.response_headers.lock().unwrap_or_else(PoisonError::into_inner);
        headers.insert(name, value);
    }

    pub(crate) fn take_response_headers(&self) -> HeaderMap {
        let mut headers = self.inner.response_headers.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *headers)
    }
}
