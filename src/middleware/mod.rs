//! Middleware layer.
//!
//! Two kinds of middleware live here.
//!
//! **Route middleware** ([`Middleware`]) runs inside the request pipeline,
//! after validation and before the handler: global ones first, then the
//! route's own (group middleware ahead of route-local). Each receives the
//! [`RequestContext`], may do async work, and either lets the request through
//! or stops it with an [`HttpError`]:
//!
//! ```rust
//! use dotroute::{HttpError, Middleware, RequestContext};
//!
//! let require_token = Middleware::new(|ctx: RequestContext| async move {
//!     match ctx.req().header("authorization") {
//!         Some(_) => None,
//!         None => Some(HttpError::unauthorized()),
//!     }
//! });
//! ```
//!
//! **Base middleware** (`cors`, `request_id`, `http_log`) wraps the whole
//! route table at the transport level and is configured through
//! [`AppOptions`](crate::AppOptions), not registered per route.

pub mod cors;
pub mod http_log;
pub mod request_id;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::handler::BoxFuture;
use crate::http_error::HttpError;

/// The verdict of one middleware.
#[derive(Debug)]
pub enum Flow {
    /// Run the next middleware (or the handler).
    Next,
    /// Answer with this error; nothing after this middleware runs.
    Halt(HttpError),
}

/// Conversion of middleware output into a [`Flow`].
///
/// `()` and `None` continue; an [`HttpError`] (bare or in `Some`) halts. An
/// `Err` is an exception and leaves the pipeline through its error boundary.
pub trait IntoFlow {
    fn into_flow(self) -> anyhow::Result<Flow>;
}

impl IntoFlow for Flow {
    fn into_flow(self) -> anyhow::Result<Flow> { Ok(self) }
}

impl IntoFlow for () {
    fn into_flow(self) -> anyhow::Result<Flow> { Ok(Flow::Next) }
}

impl IntoFlow for HttpError {
    fn into_flow(self) -> anyhow::Result<Flow> { Ok(Flow::Halt(self)) }
}

impl IntoFlow for Option<HttpError> {
    fn into_flow(self) -> anyhow::Result<Flow> {
        Ok(self.map_or(Flow::Next, Flow::Halt))
    }
}

impl<T, E> IntoFlow for Result<T, E>
where
    T: IntoFlow,
    E: Into<anyhow::Error>,
{
    fn into_flow(self) -> anyhow::Result<Flow> {
        match self {
            Ok(flow) => flow.into_flow(),
            Err(err) => Err(err.into()),
        }
    }
}

trait ErasedMiddleware: Send + Sync {
    fn call(&self, ctx: RequestContext) -> BoxFuture<anyhow::Result<Flow>>;
}

struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<anyhow::Result<Flow>> {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_flow() })
    }
}

/// A type-erased route middleware. Cheap to clone; clones share the function.
#[derive(Clone)]
pub struct Middleware {
    inner: Arc<dyn ErasedMiddleware>,
}

impl Middleware {
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoFlow + Send + 'static,
    {
        Self { inner: Arc::new(FnMiddleware(f)) }
    }

    pub(crate) fn call(&self, ctx: RequestContext) -> BoxFuture<anyhow::Result<Flow>> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}
