//! The process-wide registry and filter list. Kept in its own test binary so
//! no other test shares the globals.

mod common;

use dotroute::{
    App, AppOptions, Middleware, RequestContext, Route, all_routes, clear_response_filters, clear_routes,
    create_route_group, define_route, register_response_filter,
};
use http::StatusCode;
use serde_json::{Value, json};

use common::get;

#[tokio::test]
async fn free_functions_feed_the_default_app() {
    clear_routes();
    clear_response_filters();

    define_route(Route::get("/hello", |_ctx: RequestContext| async { json!({ "message": "hello" }) }));
    let v1 = create_route_group("/v1", vec![Middleware::new(|_ctx: RequestContext| async {})]);
    v1.define_route(Route::get("/items", |_ctx: RequestContext| async { json!([1, 2]) }));
    register_response_filter(|_ctx: RequestContext, value: Value| async move { json!({ "data": value }) });

    let listed: Vec<_> = all_routes().iter().map(|r| r.path().to_owned()).collect();
    assert_eq!(listed, ["/hello", "/v1/items"]);

    let app = App::new(AppOptions::default()).unwrap();
    assert_eq!(get(&app, "/hello").await.json(), json!({ "data": { "message": "hello" } }));
    assert_eq!(get(&app, "/v1/items").await.json(), json!({ "data": [1, 2] }));

    // clearing reopens registration for the next application
    clear_routes();
    clear_response_filters();
    assert!(all_routes().is_empty());
    define_route(Route::get("/again", |_ctx: RequestContext| async { json!({}) }));
    let app = App::builder().build().unwrap();
    assert_eq!(get(&app, "/again").await.status, StatusCode::OK);
    assert_eq!(get(&app, "/hello").await.status, StatusCode::NOT_FOUND);
}
