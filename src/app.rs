//! Application assembly and request dispatch.
//!
//! ```rust
//! use dotroute::{App, Filters, Registry, RequestContext, Route};
//! use serde_json::json;
//!
//! let routes = Registry::new();
//! routes.define_route(Route::get("/hello", |_ctx: RequestContext| async {
//!     json!({ "message": "hello world" })
//! }));
//!
//! let app = App::builder()
//!     .registry(routes)
//!     .filters(Filters::new())
//!     .dev(true)
//!     .build()
//!     .unwrap();
//! ```
//!
//! Building freezes the registry and the filter list: the route table is
//! fixed from then on.
//!
//! The route table is a `tower` service. With a CORS policy it sits behind
//! `tower_http`'s CORS layer; request ids, completion events and the access
//! log wrap both.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Body as _;
use serde_json::Value;
use tower::{Layer, Service, ServiceExt};
use tower_http::cors::Cors as CorsService;

use crate::config::{AppOptions, BeforeRoutes};
use crate::error::Error;
use crate::event::CompleteRequestEvent;
use crate::filter::Filters;
use crate::handler::BoxFuture;
use crate::method::Method;
use crate::middleware::cors::Cors;
use crate::middleware::request_id::RequestId;
use crate::middleware::{Middleware, http_log, request_id};
use crate::pipeline::{self, Pipeline, Shared};
use crate::plugin::{Plugin, PluginApi};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::route::Registry;
use crate::router::Router;

/// An assembled application. Cheap to clone; clones share the route table.
///
/// Usable directly through [`handle`](App::handle) or as a `tower::Service`.
#[derive(Clone)]
pub struct App {
    inner: Arc<Inner>,
}

struct Inner {
    routes: RouteTable,
    cors: Option<CorsService<RouteTable>>,
    options: AppOptions,
}

/// Parsed body and query of a request that reached a route's pipeline,
/// carried out of the route table in the response extensions.
#[derive(Clone)]
struct Routed {
    body: Value,
    query: Value,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Builds from the process-wide registry and filter list.
    pub fn new(options: AppOptions) -> Result<Self, Error> {
        App::builder().options(options).build()
    }

    /// Answers one request.
    ///
    /// Never fails: every outcome, including panics inside handlers, is
    /// turned into a response.
    pub async fn handle(&self, mut req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        let started = Instant::now();
        let timestamp = CompleteRequestEvent::format_timestamp(Utc::now());
        let id = request_id::assign(&mut req);
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let result = match &self.inner.cors {
            Some(cors) => cors.clone().oneshot(req).await,
            None => self.inner.routes.clone().oneshot(req).await,
        };
        let mut response = match result {
            Ok(response) => response,
            Err(never) => match never {},
        };

        if method == http::Method::OPTIONS && self.inner.cors.is_some() {
            *response.status_mut() = StatusCode::NO_CONTENT;
        }
        request_id::stamp(response.headers_mut(), &id);
        let body_len = response.body().size_hint().exact().unwrap_or(0);
        if method == http::Method::HEAD {
            *response.body_mut() = Full::default();
        }

        let elapsed = started.elapsed();
        let routed = response.extensions_mut().remove::<Routed>();
        if let (Some(observer), Some(routed)) = (&self.inner.options.on_request_complete, routed) {
            observer(&CompleteRequestEvent {
                request_id: id,
                timestamp,
                method: method.as_str().to_ascii_uppercase(),
                path: path.clone(),
                body: routed.body,
                query: routed.query,
                status_code: response.status().as_u16(),
                duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            });
        }
        if self.inner.options.enable_http_logging {
            http_log::record(&method, &path, response.status(), elapsed, body_len);
        }

        response
    }
}

impl Service<http::Request<Bytes>> for App {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<Result<Self::Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Bytes>) -> Self::Future {
        let app = self.clone();
        Box::pin(async move { Ok(app.handle(req).await) })
    }
}

/// The mounted routes plus the hooks that run in front of them.
#[derive(Clone)]
struct RouteTable {
    inner: Arc<Table>,
}

struct Table {
    router: Router<Arc<Pipeline>>,
    shared: Shared,
    before_routes: Vec<BeforeRoutes>,
}

impl Service<http::Request<Bytes>> for RouteTable {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<Result<Self::Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Bytes>) -> Self::Future {
        let table = Arc::clone(&self.inner);
        Box::pin(async move { Ok(table.dispatch(req).await) })
    }
}

impl Table {
    async fn dispatch(&self, mut req: http::Request<Bytes>) -> http::Response<Full<Bytes>> {
        // Only reached without a CORS layer; with one, the layer answers.
        if req.method() == http::Method::OPTIONS {
            return self.options_response(req.uri().path()).into_inner();
        }

        for hook in &self.before_routes {
            if let Some(response) = hook(&mut req) {
                return response.into_inner();
            }
        }

        // HEAD is answered by the GET route; the body is dropped on the way out.
        let method = if req.method() == http::Method::HEAD {
            Some(Method::Get)
        } else {
            Method::from_http(req.method())
        };
        let Some(method) = method else {
            return pipeline::not_found().into_inner();
        };
        let Some((route, params)) = self.router.lookup(method, req.uri().path()) else {
            tracing::debug!(%method, path = req.uri().path(), "no matching route");
            return pipeline::not_found().into_inner();
        };

        let id = req.extensions().get::<RequestId>().map(|id| id.0.clone()).unwrap_or_default();
        let (parts, body) = req.into_parts();
        let request = match Request::from_parts(parts, params, body) {
            Ok(request) => request,
            Err(err) => return err.into_response().into_inner(),
        };

        let outcome = route.run(request, &id, &self.shared).await;
        let mut response = outcome.response.into_inner();
        response.extensions_mut().insert(Routed { body: outcome.body, query: outcome.query });
        response
    }

    /// Without CORS, `OPTIONS` lists the methods the path answers to.
    fn options_response(&self, path: &str) -> Response {
        let allowed = self.router.allowed(path);
        if allowed.is_empty() {
            return pipeline::not_found();
        }
        let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(",");
        Response::builder().status(StatusCode::OK).header("allow", &allow).no_body()
    }
}

/// Collects options, then assembles an [`App`].
#[derive(Default)]
pub struct AppBuilder {
    options: AppOptions,
    registry: Option<Registry>,
    filters: Option<Filters>,
}

impl AppBuilder {
    /// Replaces every option set so far.
    pub fn options(mut self, options: AppOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dev(mut self, is_dev: bool) -> Self {
        self.options.is_dev = is_dev;
        self
    }

    pub fn http_logging(mut self, enabled: bool) -> Self {
        self.options.enable_http_logging = enabled;
        self
    }

    pub fn cors(mut self, cors: Cors) -> Self {
        self.options.cors = cors;
        self
    }

    /// Appends a global middleware.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.options.middlewares.push(middleware);
        self
    }

    pub fn on_exception<F>(mut self, observer: F) -> Self
    where
        F: Fn(&anyhow::Error, &Request) + Send + Sync + 'static,
    {
        self.options.on_exception = Some(Arc::new(observer));
        self
    }

    pub fn on_request_complete<F>(mut self, observer: F) -> Self
    where
        F: Fn(&CompleteRequestEvent) + Send + Sync + 'static,
    {
        self.options.on_request_complete = Some(Arc::new(observer));
        self
    }

    pub fn before_routes<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut http::Request<Bytes>) -> Option<Response> + Send + Sync + 'static,
    {
        self.options.before_routes.push(Arc::new(hook));
        self
    }

    pub fn after_routes<F>(mut self, hook: F) -> Self
    where
        F: Fn(&anyhow::Error, &Request) + Send + Sync + 'static,
    {
        self.options.after_routes.push(Arc::new(hook));
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin) -> Self {
        self.options.plugins.push(Arc::new(plugin));
        self
    }

    /// Routes come from `registry` instead of the process-wide one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Filters come from `filters` instead of the process-wide list.
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Installs plugins, runs every route's schema factory once, and mounts
    /// the routes in registration order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRoute`] for a path pattern the router cannot parse.
    pub fn build(self) -> Result<App, Error> {
        let mut options = self.options;
        let registry = self.registry.unwrap_or_else(Registry::global);
        let filters = self.filters.unwrap_or_else(Filters::global);

        let plugins = std::mem::take(&mut options.plugins);
        {
            let mut api = PluginApi {
                registry: &registry,
                filters: &filters,
                middlewares: &mut options.middlewares,
                before_routes: &mut options.before_routes,
                after_routes: &mut options.after_routes,
            };
            for plugin in &plugins {
                plugin.install(&mut api);
            }
        }
        options.plugins = plugins;

        let mut router = Router::new();
        let mut mounted = 0;
        for route in registry.freeze() {
            let pipeline = Pipeline {
                handler: Arc::clone(&route.handler),
                schema: route.schema.as_ref().map(|factory| factory()).unwrap_or_default(),
                middlewares: options.middlewares.iter().chain(&route.middlewares).cloned().collect(),
                files: route.files.clone(),
            };
            if router.insert(route.method, &route.path, Arc::new(pipeline))? {
                mounted += 1;
            }
        }

        let shared = Shared {
            filters: filters.freeze(),
            is_dev: options.is_dev,
            on_exception: options.on_exception.clone(),
            after_routes: options.after_routes.clone(),
        };
        tracing::debug!(routes = mounted, filters = shared.filters.len(), "application assembled");

        let routes = RouteTable {
            inner: Arc::new(Table { router, shared, before_routes: options.before_routes.clone() }),
        };
        let cors = match &options.cors {
            Cors::Policy(policy) => Some(policy.layer().layer(routes.clone())),
            Cors::Disabled => None,
        };

        Ok(App { inner: Arc::new(Inner { routes, cors, options }) })
    }
}
