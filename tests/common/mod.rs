//! Shared utilities for driving an `App` without a socket.

use bytes::Bytes;
use dotroute::{App, AppBuilder, Filters, Registry};
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;

/// A response with its body collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// A builder wired to fresh, private registries.
#[allow(dead_code)]
pub fn builder(routes: &Registry, filters: &Filters) -> AppBuilder {
    App::builder().registry(routes.clone()).filters(filters.clone())
}

pub async fn send(app: &App, req: http::Request<Bytes>) -> TestResponse {
    let (parts, body) = app.handle(req).await.into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    TestResponse { status: parts.status, headers: parts.headers, body }
}

#[allow(dead_code)]
pub async fn get(app: &App, uri: &str) -> TestResponse {
    send(app, http::Request::get(uri).body(Bytes::new()).unwrap()).await
}

#[allow(dead_code)]
pub async fn post_json(app: &App, uri: &str, body: Value) -> TestResponse {
    let req = http::Request::post(uri)
        .header("content-type", "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap();
    send(app, req).await
}
