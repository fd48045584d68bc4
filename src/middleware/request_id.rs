//! Request-id assignment and the identity headers stamped on every response.

use bytes::Bytes;
use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

const POWERED_BY: &str = "dotroute";

/// The id assigned to a request, stored in its extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Generates a fresh UUID v4 id and attaches it to `req`.
pub(crate) fn assign(req: &mut http::Request<Bytes>) -> String {
    let id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(id.clone()));
    id
}

/// Echoes the id and the powered-by marker.
pub(crate) fn stamp(headers: &mut HeaderMap, id: &str) {
    if let Ok(value) = HeaderValue::from_str(id) {
        headers.insert(X_REQUEST_ID, value);
    }
    headers.insert(X_POWERED_BY, HeaderValue::from_static(POWERED_BY));
}
