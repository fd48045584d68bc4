//! The error currency of the request pipeline.
//!
//! An [`HttpError`] can leave a middleware or handler two ways, and both end
//! in the same envelope:
//!
//! ```rust
//! use dotroute::{HttpError, RequestContext};
//!
//! // returned as a value
//! async fn returned(_ctx: RequestContext) -> HttpError {
//!     HttpError::forbidden()
//! }
//!
//! // raised through `?` / `Err(..)`
//! async fn raised(_ctx: RequestContext) -> anyhow::Result<serde_json::Value> {
//!     Err(HttpError::not_found().with_message("no such invoice").into())
//! }
//! ```
//!
//! The wire shape is fixed:
//!
//! ```text
//! { "status": 403, "error": "FORBIDDEN", "message": "Forbidden", "data": { … } }
//! ```
//!
//! `data` is left out entirely when none was attached.

use std::borrow::Cow;

use http::StatusCode;
use serde_json::{Map, Value, json};

use crate::response::{IntoResponse, Response};

/// A declared client-facing failure: status, machine code, message, and
/// optional structured data.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{code} ({}): {message}", .status.as_u16())]
pub struct HttpError {
    status: StatusCode,
    code: Cow<'static, str>,
    message: String,
    data: Option<Map<String, Value>>,
}

impl HttpError {
    pub fn new(
        status: StatusCode,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self { status, code: code.into(), message: message.into(), data: None }
    }

    /// `400 BAD_REQUEST`.
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", "Bad Request")
    }

    /// `401 UNAUTHORIZED`.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized")
    }

    /// `403 FORBIDDEN`.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Forbidden")
    }

    /// `404 NOT_FOUND`.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Not Found")
    }

    /// `500 INTERNAL_ERROR`.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal Server Error")
    }

    /// Replaces the default message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches structured data, echoed under `data` in the envelope.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn code(&self) -> &str { &self.code }
    pub fn message(&self) -> &str { &self.message }
    pub fn data(&self) -> Option<&Map<String, Value>> { self.data.as_ref() }

    /// The JSON envelope sent to the client.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "status": self.status.as_u16(),
            "error": self.code,
            "message": self.message,
        });
        if let (Some(data), Value::Object(fields)) = (&self.data, &mut body) {
            fields.insert("data".to_owned(), Value::Object(data.clone()));
        }
        body
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        Response::builder().status(self.status).json(&self.to_body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_fix_status_and_code() {
        let cases = [
            (HttpError::bad_request(), 400, "BAD_REQUEST", "Bad Request"),
            (HttpError::unauthorized(), 401, "UNAUTHORIZED", "Unauthorized"),
            (HttpError::forbidden(), 403, "FORBIDDEN", "Forbidden"),
            (HttpError::not_found(), 404, "NOT_FOUND", "Not Found"),
            (HttpError::internal(), 500, "INTERNAL_ERROR", "Internal Server Error"),
        ];
        for (err, status, code, message) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.code(), code);
            assert_eq!(err.message(), message);
            assert!(err.data().is_none());
        }
    }

    #[test]
    fn envelope_omits_absent_data() {
        let body = HttpError::bad_request().with_message("Custom message here").to_body();
        assert_eq!(
            body,
            json!({ "status": 400, "error": "BAD_REQUEST", "message": "Custom message here" })
        );
    }

    #[test]
    fn envelope_carries_data() {
        let mut data = Map::new();
        data.insert("field".to_owned(), json!("email"));
        let body = HttpError::forbidden().with_data(data).to_body();
        assert_eq!(body["data"], json!({ "field": "email" }));
    }

    #[test]
    fn survives_a_trip_through_anyhow() {
        let err: anyhow::Error = HttpError::unauthorized().into();
        let recovered = err.downcast::<HttpError>().unwrap();
        assert_eq!(recovered.code(), "UNAUTHORIZED");
    }
}
