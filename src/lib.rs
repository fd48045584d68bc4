//! # dotroute
//!
//! Declarative routes, request validation, middleware chains and response
//! filters on top of hyper.
//!
//! ## The model
//!
//! Routes are declared into a [`Registry`] during startup: method, path,
//! handler, and optionally a schema factory, middlewares and upload rules.
//! [`App::builder`] then assembles them once into a radix-tree route table
//! ([`matchit`]) and freezes the registry. Every request that matches a route
//! runs the same pipeline:
//!
//! - Validation: body, query and params against the route's schemas (400)
//! - Middlewares: global first, then group, then route-local; any may halt
//!   with an [`HttpError`]
//! - Handler: returns JSON, nothing (204) or an [`HttpError`]
//! - Response schema and [response filters](Filters), in registration order
//!
//! Failures that are not an [`HttpError`] end in a uniform 500 envelope.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dotroute::{App, HttpError, RequestContext, Route, Server, define_route};
//! use dotroute::schema::{ValidationSchema, number, object, string};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dotroute::Error> {
//!     define_route(Route::get("/hello", |_ctx: RequestContext| async {
//!         json!({ "message": "hello world" })
//!     }));
//!
//!     define_route(
//!         Route::post("/members", create_member)
//!             .schema(|| ValidationSchema::new().body(object([("name", string()), ("age", number())]))),
//!     );
//!
//!     let app = App::builder().dev(true).build()?;
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn create_member(ctx: RequestContext) -> Result<Value, HttpError> {
//!     let name = ctx.req().body()["name"].as_str().unwrap_or_default();
//!     if name == "root" {
//!         return Err(HttpError::forbidden());
//!     }
//!     Ok(json!({ "created": name }))
//! }
//! ```

mod app;
mod config;
mod context;
mod error;
mod event;
mod filter;
mod handler;
mod http_error;
mod method;
mod multipart;
mod pipeline;
mod plugin;
mod request;
mod response;
mod route;
mod router;
mod server;
mod upload;
mod validation;

pub mod middleware;
pub mod schema;

pub use app::{App, AppBuilder};
pub use config::{AfterRoutes, AppOptions, BeforeRoutes, OnException};
pub use context::RequestContext;
pub use error::Error;
pub use event::{CompleteRequestEvent, OnRequestComplete};
pub use filter::{Filters, IntoFiltered, ResponseFilter, clear_response_filters, register_response_filter};
pub use handler::{Handler, IntoReply, Json, Reply};
pub use http_error::HttpError;
pub use method::{Method, UnknownMethod};
pub use middleware::cors::{AllowOrigin, Cors, CorsPolicy};
pub use middleware::request_id::RequestId;
pub use middleware::{Flow, IntoFlow, Middleware};
pub use multipart::MultipartError;
pub use plugin::{Plugin, PluginApi};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use route::{Registry, Route, RouteGroup, SchemaFactory, all_routes, clear_routes, create_route_group, define_route};
pub use server::Server;
pub use upload::{FileRule, FileRules, UploadedFile};
pub use validation::{ContractViolation, Source, SourceIssues};
