mod common;

use bytes::Bytes;
use dotroute::{Filters, HttpError, Json, Registry, RequestContext, Route};
use http::StatusCode;
use serde_json::{Value, json};

use common::{builder, get, post_json, send};

#[tokio::test]
async fn answers_a_simple_route() {
    let routes = Registry::new();
    routes.define_route(Route::get("/hello", |_ctx: RequestContext| async {
        json!({ "message": "hello world" })
    }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = get(&app, "/hello").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers["content-type"], "application/json; charset=utf-8");
    assert_eq!(res.json(), json!({ "message": "hello world" }));
}

#[tokio::test]
async fn unmatched_routes_get_the_not_found_envelope() {
    let routes = Registry::new();
    routes.define_route(Route::get("/hello", |_ctx: RequestContext| async { json!({}) }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = get(&app, "/wrong-route").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json(), json!({ "status": 404, "code": "NOT_FOUND", "message": "No matching route." }));

    let res = post_json(&app, "/hello", json!({})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn path_params_in_both_syntaxes() {
    let routes = Registry::new();
    routes.define_route(Route::get("/vendors/:vendorId/products/{productId}", |ctx: RequestContext| async move {
        ctx.req().params().clone()
    }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = get(&app, "/vendors/1001/products/7").await;
    assert_eq!(res.json(), json!({ "vendorId": "1001", "productId": "7" }));
}

#[tokio::test]
async fn query_and_body_reach_the_handler() {
    let routes = Registry::new();
    routes.define_route(Route::post("/echo", |ctx: RequestContext| async move {
        json!({ "query": ctx.req().query(), "body": ctx.req().body() })
    }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = post_json(&app, "/echo?tag=a&tag=b&page=2", json!({ "name": "Ada" })).await;
    assert_eq!(
        res.json(),
        json!({ "query": { "tag": ["a", "b"], "page": "2" }, "body": { "name": "Ada" } })
    );
}

#[tokio::test]
async fn first_registration_wins() {
    let routes = Registry::new();
    routes.define_route(Route::get("/dup", |_ctx: RequestContext| async { json!({ "n": 1 }) }));
    routes.define_route(Route::get("/dup", |_ctx: RequestContext| async { json!({ "n": 2 }) }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    assert_eq!(get(&app, "/dup").await.json(), json!({ "n": 1 }));
}

#[tokio::test]
async fn empty_results_are_no_content() {
    let routes = Registry::new();
    routes.define_route(Route::delete("/items/:id", |_ctx: RequestContext| async {}));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = send(&app, http::Request::delete("/items/3").body(Bytes::new()).unwrap()).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn typed_results_serialise() {
    #[derive(serde::Serialize)]
    struct Member {
        id: u32,
        name: &'static str,
    }

    let routes = Registry::new();
    routes.define_route(Route::get("/members/:id", |ctx: RequestContext| async move {
        let id: u32 = ctx.req().param("id").and_then(|id| id.parse().ok()).ok_or_else(HttpError::bad_request)?;
        Ok::<_, HttpError>(Json(Member { id, name: "Ada" }))
    }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    assert_eq!(get(&app, "/members/4").await.json(), json!({ "id": 4, "name": "Ada" }));
    assert_eq!(get(&app, "/members/x").await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let routes = Registry::new();
    routes.define_route(Route::post("/echo", |ctx: RequestContext| async move { ctx.req().body().clone() }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let req = http::Request::post("/echo")
        .header("content-type", "application/json")
        .body(Bytes::from_static(b"{ nope"))
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[test]
fn invalid_patterns_fail_assembly() {
    let routes = Registry::new();
    routes.define_route(Route::get("/files/{*rest}/tail", |_ctx: RequestContext| async { json!({}) }));
    assert!(matches!(
        builder(&routes, &Filters::new()).build(),
        Err(dotroute::Error::InvalidRoute { .. })
    ));
}

#[test]
#[should_panic(expected = "registered after the application was built")]
fn registry_is_frozen_once_built() {
    let routes = Registry::new();
    let _app = builder(&routes, &Filters::new()).build().unwrap();
    routes.define_route(Route::get("/late", |_ctx: RequestContext| async { json!({}) }));
}

#[tokio::test]
async fn overlapping_patterns_answer_in_registration_order() {
    let routes = Registry::new();
    routes.define_route(Route::get("/users/:id", |_ctx: RequestContext| async { json!({ "route": "by-id" }) }));
    routes.define_route(Route::get("/users/me", |_ctx: RequestContext| async { json!({ "route": "me" }) }));
    routes.define_route(Route::get("/teams/mine", |_ctx: RequestContext| async { json!({ "route": "mine" }) }));
    routes.define_route(Route::get("/teams/:id", |_ctx: RequestContext| async { json!({ "route": "team" }) }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    assert_eq!(get(&app, "/users/me").await.json(), json!({ "route": "by-id" }));
    assert_eq!(get(&app, "/teams/mine").await.json(), json!({ "route": "mine" }));
    assert_eq!(get(&app, "/teams/42").await.json(), json!({ "route": "team" }));
}

#[tokio::test]
async fn path_params_are_percent_decoded() {
    let routes = Registry::new();
    routes.define_route(Route::get("/users/:name", |ctx: RequestContext| async move {
        json!({ "name": ctx.req().param("name") })
    }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    assert_eq!(get(&app, "/users/John%20Doe").await.json(), json!({ "name": "John Doe" }));
    assert_eq!(get(&app, "/users/caf%C3%A9").await.json(), json!({ "name": "café" }));
}

#[tokio::test]
async fn head_is_served_by_the_get_route_without_a_body() {
    let routes = Registry::new();
    routes.define_route(Route::get("/hello", |_ctx: RequestContext| async { json!({ "message": "hello world" }) }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let head = http::Request::head("/hello").body(Bytes::new()).unwrap();
    let res = send(&app, head).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers["content-type"], "application/json; charset=utf-8");
    assert!(res.body.is_empty());

    let head = http::Request::head("/nowhere").body(Bytes::new()).unwrap();
    assert_eq!(send(&app, head).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wire_methods_are_case_sensitive() {
    let routes = Registry::new();
    routes.define_route(Route::get("/hello", |_ctx: RequestContext| async { json!({}) }));
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let req = http::Request::builder()
        .method(http::Method::from_bytes(b"get").unwrap())
        .uri("/hello")
        .body(Bytes::new())
        .unwrap();
    assert_eq!(send(&app, req).await.status, StatusCode::NOT_FOUND);
}
