mod common;

use std::sync::{Arc, Mutex};

use dotroute::{Filters, HttpError, IntoResponse, Middleware, PluginApi, Registry, RequestContext, Route};
use http::StatusCode;
use http::header::{HeaderName, HeaderValue};
use serde_json::{Value, json};

use common::{builder, get};

type Log = Arc<Mutex<Vec<&'static str>>>;

fn recorder(log: &Log, name: &'static str) -> Middleware {
    let log = Arc::clone(log);
    Middleware::new(move |_ctx: RequestContext| {
        let log = Arc::clone(&log);
        async move { log.lock().unwrap().push(name) }
    })
}

fn recording_handler(log: &Log) -> impl Fn(RequestContext) -> std::future::Ready<Value> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_ctx: RequestContext| {
        log.lock().unwrap().push("handler");
        std::future::ready(json!({ "ok": true }))
    }
}

#[tokio::test]
async fn global_middlewares_run_before_route_middlewares() {
    let log: Log = Log::default();
    let routes = Registry::new();
    routes.define_route(Route::get("/hello", recording_handler(&log)).middlewares([recorder(&log, "route")]));

    let app = builder(&routes, &Filters::new())
        .middleware(recorder(&log, "global-1"))
        .middleware(recorder(&log, "global-2"))
        .build()
        .unwrap();

    assert_eq!(get(&app, "/hello").await.status, StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), ["global-1", "global-2", "route", "handler"]);
}

#[tokio::test]
async fn a_halting_middleware_stops_everything_after_it() {
    let log: Log = Log::default();
    let routes = Registry::new();
    routes.define_route(
        Route::get("/admin", recording_handler(&log))
            .middleware(|_ctx: RequestContext| async { Some(HttpError::forbidden()) })
            .middlewares([recorder(&log, "after")]),
    );
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = get(&app, "/admin").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.json(), json!({ "status": 403, "error": "FORBIDDEN", "message": "Forbidden" }));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn a_middleware_error_is_an_exception() {
    let routes = Registry::new();
    routes.define_route(
        Route::get("/hello", |_ctx: RequestContext| async { json!({}) })
            .middleware(|_ctx: RequestContext| async { Err::<(), _>(anyhow::anyhow!("db down")) }),
    );
    let app = builder(&routes, &Filters::new()).build().unwrap();

    assert_eq!(get(&app, "/hello").await.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn middlewares_share_the_context_with_the_handler() {
    #[derive(Debug)]
    struct User {
        name: &'static str,
    }

    let routes = Registry::new();
    routes.define_route(
        Route::get("/me", |ctx: RequestContext| async move {
            ctx.set_header(HeaderName::from_static("x-handled-by"), HeaderValue::from_static("me"));
            let user = ctx.user::<User>().ok_or_else(HttpError::unauthorized)?;
            Ok::<_, HttpError>(json!({ "name": user.name }))
        })
        .middleware(|ctx: RequestContext| async move { ctx.set_user(User { name: "Ada" }) }),
    );
    let app = builder(&routes, &Filters::new()).build().unwrap();

    let res = get(&app, "/me").await;
    assert_eq!(res.json(), json!({ "name": "Ada" }));
    assert_eq!(res.headers["x-handled-by"], "me");
}

#[tokio::test]
async fn nested_groups_compose_prefixes_and_middlewares() {
    let log: Log = Log::default();
    let routes = Registry::new();

    let api = routes.create_route_group("/api", vec![recorder(&log, "m1")]);
    let admin = api.create_group("/admin", vec![recorder(&log, "m2")]);
    admin.define_route(Route::get("/users", recording_handler(&log)).middlewares([recorder(&log, "m3")]));

    let app = builder(&routes, &Filters::new()).build().unwrap();

    assert_eq!(get(&app, "/api/admin/users").await.status, StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), ["m1", "m2", "m3", "handler"]);
    assert_eq!(get(&app, "/admin/users").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn filters_run_in_order_on_success_only() {
    let routes = Registry::new();
    routes.define_route(Route::get("/data", |_ctx: RequestContext| async { json!({ "n": 1 }) }));
    routes.define_route(Route::get("/denied", |_ctx: RequestContext| async { HttpError::forbidden() }));
    routes.define_route(Route::get("/empty", |_ctx: RequestContext| async {}));

    let filters = Filters::new();
    filters.register(|_ctx: RequestContext, value: Value| async move { json!({ "data": value }) });
    filters.register(|ctx: RequestContext, value: Value| async move {
        json!({ "requestId": ctx.request_id(), "wrapped": value })
    });
    let app = builder(&routes, &filters).build().unwrap();

    let res = get(&app, "/data").await;
    let body = res.json();
    assert_eq!(body["wrapped"], json!({ "data": { "n": 1 } }));
    assert_eq!(body["requestId"], res.headers["x-request-id"].to_str().unwrap());

    assert_eq!(get(&app, "/denied").await.json()["error"], "FORBIDDEN");
    assert_eq!(get(&app, "/empty").await.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn a_failing_filter_is_an_exception() {
    let routes = Registry::new();
    routes.define_route(Route::get("/data", |_ctx: RequestContext| async { json!({}) }));
    let filters = Filters::new();
    filters.register(|_ctx: RequestContext, _value: Value| async { Err::<Value, _>(anyhow::anyhow!("filter broke")) });
    let app = builder(&routes, &filters).build().unwrap();

    assert_eq!(get(&app, "/data").await.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn plugins_contribute_routes_middlewares_filters_and_hooks() {
    let log: Log = Log::default();
    let plugin_log = Arc::clone(&log);

    let plugin = move |api: &mut PluginApi<'_>| {
        api.add_route(Route::get("/plugin", |_ctx: RequestContext| async { json!({ "from": "plugin" }) }));
        api.add_group("/v1", vec![]).define_route(Route::get("/status", |_ctx: RequestContext| async {
            json!({ "up": true })
        }));
        api.add_global_middleware(recorder(&plugin_log, "plugin-mw"));
        api.add_response_filter(|_ctx: RequestContext, value: Value| async move { json!({ "data": value }) });
        api.use_before_routes(|req| {
            (req.uri().path() == "/blocked").then(|| HttpError::forbidden().into_response())
        });
    };

    let routes = Registry::new();
    let app = builder(&routes, &Filters::new())
        .middleware(recorder(&log, "app-mw"))
        .plugin(plugin)
        .build()
        .unwrap();

    assert_eq!(get(&app, "/plugin").await.json(), json!({ "data": { "from": "plugin" } }));
    assert_eq!(get(&app, "/v1/status").await.json(), json!({ "data": { "up": true } }));
    assert_eq!(get(&app, "/blocked").await.status, StatusCode::FORBIDDEN);
    assert_eq!(log.lock().unwrap()[..2], ["app-mw", "plugin-mw"]);
}
