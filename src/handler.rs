//! Handler trait, handler results and type erasure.
//!
//! # How async handlers are stored
//!
//! The registry holds handlers of *different* types in one `Vec`, so each is
//! hidden behind a trait object (`dyn ErasedHandler`) and stored uniformly.
//!
//! ```text
//! async fn hello(ctx: RequestContext) -> Json<Hello> { … }   ← user writes this
//!        ↓ Route::get("/hello", hello)
//! hello.into_boxed_handler()                                 ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                                 ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx)  at request time                         ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(ctx).await.into_reply() })          ← BoxFuture<Result<Reply>>
//! ```
//!
//! # What a handler may return
//!
//! Anything implementing [`IntoReply`]: a [`Json`] value, a raw
//! `serde_json::Value`, `()` for "nothing", an [`HttpError`], or a `Result`
//! of any of those. An `Err` is an exception: if it wraps an `HttpError` the
//! client gets that error's envelope, otherwise the global error handler
//! answers `500`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::context::RequestContext;
use crate::http_error::HttpError;

/// A heap-allocated, type-erased future.
///
/// `Pin<Box<…>>` because the runtime polls the future in place; `Send +
/// 'static` so tokio may move it across worker threads.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What a handler produced, before shaping into a response.
#[derive(Debug)]
pub enum Reply {
    /// A JSON value for the success path.
    Value(Value),
    /// No value: answered with `204 No Content`.
    Empty,
    /// A declared error returned as a value.
    Error(HttpError),
}

/// Conversion of handler output into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> anyhow::Result<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> anyhow::Result<Reply> { Ok(self) }
}

impl IntoReply for Value {
    fn into_reply(self) -> anyhow::Result<Reply> { Ok(Reply::Value(self)) }
}

impl IntoReply for () {
    fn into_reply(self) -> anyhow::Result<Reply> { Ok(Reply::Empty) }
}

impl IntoReply for HttpError {
    fn into_reply(self) -> anyhow::Result<Reply> { Ok(Reply::Error(self)) }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> anyhow::Result<Reply> {
        self.map_or(Ok(Reply::Empty), IntoReply::into_reply)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<anyhow::Error>,
{
    fn into_reply(self) -> anyhow::Result<Reply> {
        match self {
            Ok(value) => value.into_reply(),
            Err(err) => Err(err.into()),
        }
    }
}

/// Serialises any `T: Serialize` as the handler's JSON result.
///
/// ```rust
/// use dotroute::{Json, RequestContext};
///
/// #[derive(serde::Serialize)]
/// struct Hello { message: &'static str }
///
/// async fn hello(_ctx: RequestContext) -> Json<Hello> {
///     Json(Hello { message: "hello world" })
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> anyhow::Result<Reply> {
        Ok(Reply::Value(serde_json::to_value(self.0)?))
    }
}

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: RequestContext) -> BoxFuture<anyhow::Result<Reply>>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any `async fn` (or closure returning a future)
/// with the shape:
///
/// ```text
/// async fn name(ctx: RequestContext) -> impl IntoReply
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype bridging a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<anyhow::Result<Reply>> {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_reply() })
    }
}
