//! Minimal dotroute example: validated JSON endpoints, a guarded route group
//! and a response filter.
//!
//! Run with:
//!   RUST_LOG=info DOTROUTE_HTTP_LOG=1 cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/hello
//!   curl -X POST http://localhost:3000/members \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice","age":30}'
//!   curl http://localhost:3000/admin/stats -H 'authorization: Bearer demo'
//!   curl http://localhost:3000/wrong-route

use dotroute::schema::{ValidationSchema, number, object, string};
use dotroute::{
    App, AppOptions, HttpError, Middleware, RequestContext, Route, Server, create_route_group, define_route,
    register_response_filter,
};
use serde_json::{Value, json};

#[tokio::main]
async fn main() -> Result<(), dotroute::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    define_route(Route::get("/hello", |_ctx: RequestContext| async {
        json!({ "message": "hello world" })
    }));

    define_route(
        Route::post("/members", create_member)
            .schema(|| ValidationSchema::new().body(object([("name", string()), ("age", number())]))),
    );

    let admin = create_route_group("/admin", vec![Middleware::new(require_token)]);
    admin.define_route(Route::get("/stats", |ctx: RequestContext| async move {
        let user = ctx.user::<String>().map(|u| u.as_str().to_owned());
        json!({ "routes": dotroute::all_routes().len(), "user": user })
    }));

    register_response_filter(|ctx: RequestContext, data: Value| async move {
        json!({ "requestId": ctx.request_id(), "data": data })
    });

    let app = App::builder()
        .options(AppOptions::from_env())
        .on_request_complete(|event| tracing::info!(status = event.status_code, ms = event.duration_ms, "done"))
        .build()?;

    Server::bind("0.0.0.0:3000").serve(app).await
}

// POST /members
async fn create_member(ctx: RequestContext) -> Value {
    let body = ctx.req().body();
    tracing::info!(name = %body["name"], "member created");
    json!({ "created": body })
}

async fn require_token(ctx: RequestContext) -> Option<HttpError> {
    match ctx.req().header("authorization").and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => {
            ctx.set_user(token.to_owned());
            None
        }
        None => Some(HttpError::unauthorized()),
    }
}
