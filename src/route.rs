//! Route definitions, the route registry, and route groups.
//!
//! Routes are declared up front and assembled into an [`App`](crate::App)
//! later:
//!
//! ```rust
//! use dotroute::{Json, Registry, RequestContext, Route};
//! use dotroute::schema::{ValidationSchema, number, object, string};
//! use serde_json::json;
//!
//! let routes = Registry::new();
//!
//! routes.define_route(Route::get("/hello", |_ctx: RequestContext| async {
//!     json!({ "message": "hello world" })
//! }));
//!
//! routes.define_route(
//!     Route::post("/members", |ctx: RequestContext| async move { ctx.req().body().clone() })
//!         .schema(|| ValidationSchema::new().body(object([("name", string()), ("age", number())]))),
//! );
//!
//! let admin = routes.create_route_group("/admin", vec![]);
//! let billing = admin.create_group("/billing", vec![]);
//! billing.define_route(Route::get("/invoices", |_ctx: RequestContext| async { Json(vec![1, 2]) }));
//!
//! assert_eq!(routes.routes()[2].path(), "/admin/billing/invoices");
//! ```
//!
//! Registration order is mount order. When two routes overlap, the one
//! registered first answers.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::context::RequestContext;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{IntoFlow, Middleware};
use crate::schema::ValidationSchema;
use crate::upload::FileRules;

/// Produces a route's validators. Invoked once, at application assembly.
pub type SchemaFactory = Arc<dyn Fn() -> ValidationSchema + Send + Sync>;

/// One declared route: method, path pattern, handler, and optional schema,
/// middlewares and upload rules.
///
/// Path patterns take named segments as `{id}` or `:id`.
#[doc(alias = "RouteDefinition")]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) handler: BoxedHandler,
    pub(crate) schema: Option<SchemaFactory>,
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) files: Option<FileRules>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>, handler: impl Handler) -> Self {
        Self {
            method,
            path: path.into(),
            handler: handler.into_boxed_handler(),
            schema: None,
            middlewares: Vec::new(),
            files: None,
        }
    }

    pub fn get(path: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(Method::Get, path, handler)
    }

    pub fn post(path: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(Method::Post, path, handler)
    }

    pub fn put(path: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(Method::Put, path, handler)
    }

    pub fn delete(path: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(Method::Delete, path, handler)
    }

    pub fn patch(path: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(Method::Patch, path, handler)
    }

    /// Declares the route's validators through a factory run once at assembly.
    pub fn schema<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> ValidationSchema + Send + Sync + 'static,
    {
        self.schema = Some(Arc::new(factory));
        self
    }

    /// Appends a route-local middleware.
    pub fn middleware<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoFlow + Send + 'static,
    {
        self.middlewares.push(Middleware::new(f));
        self
    }

    /// Appends already-built middlewares, in order.
    pub fn middlewares(mut self, middlewares: impl IntoIterator<Item = Middleware>) -> Self {
        self.middlewares.extend(middlewares);
        self
    }

    pub fn files(mut self, rules: FileRules) -> Self {
        self.files = Some(rules);
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn middleware_count(&self) -> usize { self.middlewares.len() }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("middlewares", &self.middlewares.len())
            .field("schema", &self.schema.is_some())
            .field("files", &self.files)
            .finish()
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// The ordered store of route definitions.
///
/// A cloneable handle: clones share one store. Open for registration until an
/// [`App`](crate::App) is built from it, frozen afterwards.
#[derive(Clone, Default)]
pub struct Registry {
    state: Arc<RwLock<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    routes: Vec<Arc<Route>>,
    frozen: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`define_route`] and by
    /// [`App::builder`](crate::App::builder) unless told otherwise.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Appends a route. Duplicates are accepted; the first one mounted wins.
    ///
    /// # Panics
    ///
    /// Panics once an application has been built from this registry:
    /// registration belongs to startup.
    pub fn define_route(&self, route: Route) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        assert!(
            !state.frozen,
            "route `{} {}` registered after the application was built",
            route.method,
            route.path,
        );
        state.routes.push(Arc::new(route));
    }

    /// Every route, in registration order.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).routes.clone()
    }

    /// A builder that prefixes paths with `prefix` and runs `middlewares`
    /// ahead of each route's own.
    pub fn create_route_group(&self, prefix: impl Into<String>, middlewares: Vec<Middleware>) -> RouteGroup {
        RouteGroup { registry: self.clone(), prefix: prefix.into(), middlewares }
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears and unfreezes the registry. Meant for isolating tests.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.routes.clear();
        state.frozen = false;
    }

    /// Freezes the registry and returns its contents.
    pub(crate) fn freeze(&self) -> Vec<Arc<Route>> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.frozen = true;
        state.routes.clone()
    }
}

/// Registration-time builder sharing a path prefix and leading middlewares.
#[derive(Clone, Debug)]
pub struct RouteGroup {
    registry: Registry,
    prefix: String,
    middlewares: Vec<Middleware>,
}

impl RouteGroup {
    /// Registers `route` under the group's prefix, with the group's
    /// middlewares ahead of the route's own.
    pub fn define_route(&self, mut route: Route) {
        route.path = format!("{}{}", self.prefix, route.path);
        let own = std::mem::take(&mut route.middlewares);
        route.middlewares = self.middlewares.iter().cloned().chain(own).collect();
        self.registry.define_route(route);
    }

    /// A nested group: prefixes concatenate, parent middlewares run first.
    pub fn create_group(&self, prefix: impl AsRef<str>, middlewares: Vec<Middleware>) -> RouteGroup {
        RouteGroup {
            registry: self.registry.clone(),
            prefix: format!("{}{}", self.prefix, prefix.as_ref()),
            middlewares: self.middlewares.iter().cloned().chain(middlewares).collect(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("routes", &self.len()).finish()
    }
}

/// Registers a route in the process-wide registry.
pub fn define_route(route: Route) {
    Registry::global().define_route(route);
}

/// A group on the process-wide registry.
pub fn create_route_group(prefix: impl Into<String>, middlewares: Vec<Middleware>) -> RouteGroup {
    Registry::global().create_route_group(prefix, middlewares)
}

/// Every route of the process-wide registry, in registration order.
pub fn all_routes() -> Vec<Arc<Route>> {
    Registry::global().routes()
}

/// Empties the process-wide registry.
pub fn clear_routes() {
    Registry::global().reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    async fn ok(_ctx: RequestContext) -> Value {
        json!({ "ok": true })
    }

    fn noop() -> Middleware {
        Middleware::new(|_ctx: RequestContext| async {})
    }

    #[test]
    fn keeps_registration_order() {
        let routes = Registry::new();
        routes.define_route(Route::get("/a", ok));
        routes.define_route(Route::post("/b", ok));
        routes.define_route(Route::get("/a", ok));

        let listed: Vec<_> = routes.routes().iter().map(|r| (r.method(), r.path().to_owned())).collect();
        assert_eq!(
            listed,
            [(Method::Get, "/a".to_owned()), (Method::Post, "/b".to_owned()), (Method::Get, "/a".to_owned())]
        );
    }

    #[test]
    fn groups_prefix_and_prepend_middlewares() {
        let routes = Registry::new();
        let admin = routes.create_route_group("/admin", vec![noop()]);
        let billing = admin.create_group("/billing", vec![noop(), noop()]);
        billing.define_route(Route::get("/invoices", ok).middleware(|_ctx: RequestContext| async {}));
        admin.define_route(Route::get("/users", ok));

        let listed = routes.routes();
        assert_eq!(listed[0].path(), "/admin/billing/invoices");
        assert_eq!(listed[0].middleware_count(), 4);
        assert_eq!(listed[1].path(), "/admin/users");
        assert_eq!(listed[1].middleware_count(), 1);
        assert_eq!(billing.prefix(), "/admin/billing");
    }

    #[test]
    fn reset_clears_and_unfreezes() {
        let routes = Registry::new();
        routes.define_route(Route::get("/a", ok));
        let _ = routes.freeze();
        routes.reset();
        assert!(routes.is_empty());
        routes.define_route(Route::get("/b", ok));
        assert_eq!(routes.len(), 1);
    }

    #[test]
    #[should_panic(expected = "registered after the application was built")]
    fn frozen_registry_rejects_routes() {
        let routes = Registry::new();
        let _ = routes.freeze();
        routes.define_route(Route::get("/late", ok));
    }
}
