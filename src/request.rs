//! Incoming HTTP request type.
//!
//! Built once per routed request from the transport's `http::Request<Bytes>`:
//! the query string, path parameters and body are decoded into JSON values so
//! the validation stage can parse (and coerce) them before any middleware or
//! handler sees the request.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap, Uri};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::http_error::HttpError;
use crate::multipart;
use crate::upload::UploadedFile;

/// An incoming HTTP request, after routing.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: http::Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) extensions: Extensions,
    pub(crate) params: Value,
    pub(crate) query: Value,
    pub(crate) body: Value,
    pub(crate) raw_body: Bytes,
    pub(crate) files: Vec<UploadedFile>,
}

impl Request {
    /// Decodes query, parameters and body. Path parameters arrive raw from
    /// the router and are percent-decoded here.
    ///
    /// Bodies are decoded by content type: JSON (or no content type) into the
    /// parsed value, `application/x-www-form-urlencoded` and the text fields of
    /// `multipart/form-data` into an object of strings. An empty body, or any
    /// other content type, leaves `body` as `{}`.
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        params: HashMap<String, String>,
        raw_body: Bytes,
    ) -> Result<Self, HttpError> {
        let query = parts.uri.query().map(decode_pairs).unwrap_or_else(|| Value::Object(Map::new()));
        let params = Value::Object(
            params
                .into_iter()
                .map(|(k, v)| (k, Value::String(percent_decode_str(&v).decode_utf8_lossy().into_owned())))
                .collect(),
        );

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let mut files = Vec::new();
        let body = if let Some(boundary) = multipart::boundary(content_type) {
            let boundary = boundary.map_err(malformed_multipart)?;
            let form = multipart::parse_form(&raw_body, &boundary).map_err(malformed_multipart)?;
            files = form.files;
            Value::Object(form.fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
        } else if raw_body.is_empty() {
            Value::Object(Map::new())
        } else if is_json(content_type) {
            serde_json::from_slice(&raw_body).map_err(|e| {
                HttpError::bad_request().with_message(format!("Malformed JSON body: {e}"))
            })?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            decode_pairs(&String::from_utf8_lossy(&raw_body))
        } else {
            Value::Object(Map::new())
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            params,
            query,
            body,
            raw_body,
            files,
        })
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn extensions(&self) -> &Extensions { &self.extensions }

    /// Path parameters as an object, after validation/coercion.
    pub fn params(&self) -> &Value { &self.params }
    /// Query string as an object, after validation/coercion.
    pub fn query(&self) -> &Value { &self.query }
    /// Decoded body, after validation/coercion.
    pub fn body(&self) -> &Value { &self.body }
    /// The body bytes exactly as received.
    pub fn raw_body(&self) -> &Bytes { &self.raw_body }
    pub fn files(&self) -> &[UploadedFile] { &self.files }

    /// Header lookup; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a path parameter as a string.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`. Parameters coerced to non-strings by a params schema are
    /// reachable through [`params`](Self::params).
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn body_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.body)
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.query)
    }

    pub fn params_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.params)
    }
}

fn is_json(content_type: &str) -> bool {
    let main = content_type.split(';').next().unwrap_or("").trim();
    main.is_empty() || main.eq_ignore_ascii_case("application/json") || main.ends_with("+json")
}

fn malformed_multipart(err: multipart::MultipartError) -> HttpError {
    HttpError::bad_request().with_message(format!("Malformed multipart body: {err}"))
}

/// `a=1&b=2&b=3` → `{"a":"1","b":["2","3"]}`
fn decode_pairs(input: &str) -> Value {
    let mut out = Map::new();
    for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
        let value = Value::String(value.into_owned());
        match out.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(uri: &str, content_type: Option<&str>, body: &'static [u8]) -> Result<Request, HttpError> {
        let mut req = http::Request::builder().method("POST").uri(uri);
        if let Some(ct) = content_type {
            req = req.header(CONTENT_TYPE, ct);
        }
        let (parts, ()) = req.body(()).unwrap().into_parts();
        let params = HashMap::from([("id".to_owned(), "7".to_owned())]);
        Request::from_parts(parts, params, Bytes::from_static(body))
    }

    #[test]
    fn decodes_query_params_and_json() {
        let req = build("/vendors/7?page=2&tag=a&tag=b", None, br#"{"name":"ABC Corp."}"#).unwrap();
        assert_eq!(req.query(), &json!({ "page": "2", "tag": ["a", "b"] }));
        assert_eq!(req.param("id"), Some("7"));
        assert_eq!(req.body(), &json!({ "name": "ABC Corp." }));
        assert_eq!(req.path(), "/vendors/7");
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        let req = build("/x", Some("application/json"), b"").unwrap();
        assert_eq!(req.body(), &json!({}));
        assert_eq!(req.query(), &json!({}));
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let err = build("/x", Some("application/json"), b"{nope").unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn urlencoded_forms_are_decoded() {
        let req = build("/x", Some("application/x-www-form-urlencoded"), b"name=Alice&age=25").unwrap();
        assert_eq!(req.body(), &json!({ "name": "Alice", "age": "25" }));
    }

    #[test]
    fn typed_views() {
        #[derive(serde::Deserialize)]
        struct Vendor {
            name: String,
        }
        let req = build("/x", None, br#"{"name":"ABC"}"#).unwrap();
        assert_eq!(req.body_as::<Vendor>().unwrap().name, "ABC");
    }
}
