//! Plugins: bundles of routes, middlewares, filters and hooks installed while
//! an application is assembled.
//!
//! ```rust
//! use dotroute::{App, Filters, PluginApi, Registry, RequestContext, Route};
//! use serde_json::json;
//!
//! let health = |api: &mut PluginApi<'_>| {
//!     api.add_route(Route::get("/health", |_ctx: RequestContext| async { json!({ "ok": true }) }));
//! };
//!
//! let app = App::builder()
//!     .registry(Registry::new())
//!     .filters(Filters::new())
//!     .plugin(health)
//!     .build()
//!     .unwrap();
//! ```

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::config::{AfterRoutes, BeforeRoutes};
use crate::context::RequestContext;
use crate::filter::{Filters, IntoFiltered};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use crate::route::{Registry, Route, RouteGroup};

pub trait Plugin: Send + Sync + 'static {
    fn install(&self, api: &mut PluginApi<'_>);
}

impl<F> Plugin for F
where
    F: Fn(&mut PluginApi<'_>) + Send + Sync + 'static,
{
    fn install(&self, api: &mut PluginApi<'_>) {
        self(api)
    }
}

/// What a plugin may touch. Only valid during assembly.
pub struct PluginApi<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) filters: &'a Filters,
    pub(crate) middlewares: &'a mut Vec<Middleware>,
    pub(crate) before_routes: &'a mut Vec<BeforeRoutes>,
    pub(crate) after_routes: &'a mut Vec<AfterRoutes>,
}

impl PluginApi<'_> {
    pub fn add_route(&mut self, route: Route) {
        self.registry.define_route(route);
    }

    pub fn add_group(&mut self, prefix: impl Into<String>, middlewares: Vec<Middleware>) -> RouteGroup {
        self.registry.create_route_group(prefix, middlewares)
    }

    /// Appended after the application's own global middlewares.
    pub fn add_global_middleware(&mut self, middleware: Middleware) {
        self.middlewares.push(middleware);
    }

    pub fn add_response_filter<F, Fut, R>(&mut self, f: F)
    where
        F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoFiltered + Send + 'static,
    {
        self.filters.register(f);
    }

    pub fn use_before_routes<F>(&mut self, hook: F)
    where
        F: Fn(&mut http::Request<Bytes>) -> Option<Response> + Send + Sync + 'static,
    {
        self.before_routes.push(Arc::new(hook));
    }

    pub fn use_after_routes<F>(&mut self, hook: F)
    where
        F: Fn(&anyhow::Error, &Request) + Send + Sync + 'static,
    {
        self.after_routes.push(Arc::new(hook));
    }
}
