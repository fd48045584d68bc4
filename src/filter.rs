//! Response filters: post-processing of successful handler results.
//!
//! Filters run in registration order, each receiving the previous one's
//! output, and only on the success path: never on error envelopes, never on
//! `204 No Content`.
//!
//! ```rust
//! use dotroute::{Filters, RequestContext};
//! use serde_json::{Value, json};
//!
//! let filters = Filters::new();
//! filters.register(|ctx: RequestContext, result: Value| async move {
//!     json!({ "requestId": ctx.request_id(), "data": result })
//! });
//! ```

use std::future::Future;
use std::sync::{Arc, RwLock, PoisonError};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::context::RequestContext;
use crate::handler::BoxFuture;

/// Conversion of filter output into the next value in the chain.
pub trait IntoFiltered {
    fn into_filtered(self) -> anyhow::Result<Value>;
}

impl IntoFiltered for Value {
    fn into_filtered(self) -> anyhow::Result<Value> { Ok(self) }
}

impl<E: Into<anyhow::Error>> IntoFiltered for Result<Value, E> {
    fn into_filtered(self) -> anyhow::Result<Value> {
        self.map_err(Into::into)
    }
}

trait ErasedFilter: Send + Sync {
    fn apply(&self, ctx: RequestContext, value: Value) -> BoxFuture<anyhow::Result<Value>>;
}

struct FnFilter<F>(F);

impl<F, Fut, R> ErasedFilter for FnFilter<F>
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFiltered + Send + 'static,
{
    fn apply(&self, ctx: RequestContext, value: Value) -> BoxFuture<anyhow::Result<Value>> {
        let fut = (self.0)(ctx, value);
        Box::pin(async move { fut.await.into_filtered() })
    }
}

/// One type-erased response filter.
#[derive(Clone)]
pub struct ResponseFilter {
    inner: Arc<dyn ErasedFilter>,
}

impl ResponseFilter {
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoFiltered + Send + 'static,
    {
        Self { inner: Arc::new(FnFilter(f)) }
    }
}

/// Runs `value` through `filters` left to right.
pub(crate) async fn apply_all(
    filters: &[ResponseFilter],
    ctx: &RequestContext,
    mut value: Value,
) -> anyhow::Result<Value> {
    for filter in filters {
        value = filter.inner.apply(ctx.clone(), value).await?;
    }
    Ok(value)
}

static GLOBAL: Lazy<Filters> = Lazy::new(Filters::new);

/// The ordered, append-only filter list of an application.
///
/// A cloneable handle: clones share one list. Registration is open until an
/// [`App`](crate::App) is built from the list, after which it is frozen.
#[derive(Clone, Default)]
pub struct Filters {
    state: Arc<RwLock<FilterState>>,
}

#[derive(Default)]
struct FilterState {
    filters: Vec<ResponseFilter>,
    frozen: bool,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide list used by [`register_response_filter`] and by
    /// [`App::builder`](crate::App::builder) unless told otherwise.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Appends a filter.
    ///
    /// # Panics
    ///
    /// Panics once an application has been built from this list: registration
    /// belongs to startup.
    pub fn register<F, Fut, R>(&self, f: F)
    where
        F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoFiltered + Send + 'static,
    {
        self.push(ResponseFilter::new(f));
    }

    pub(crate) fn push(&self, filter: ResponseFilter) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        assert!(!state.frozen, "response filter registered after the application was built");
        state.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears and unfreezes the list. Meant for isolating tests.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.filters.clear();
        state.frozen = false;
    }

    /// Freezes the list and returns its contents.
    pub(crate) fn freeze(&self) -> Vec<ResponseFilter> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.frozen = true;
        state.filters.clone()
    }
}

/// Appends a filter to the process-wide list.
pub fn register_response_filter<F, Fut, R>(f: F)
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFiltered + Send + 'static,
{
    Filters::global().register(f);
}

/// Empties the process-wide list.
pub fn clear_response_filters() {
    Filters::global().reset();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_registration_order_and_resets() {
        let filters = Filters::new();
        filters.register(|_ctx: RequestContext, v: Value| async move { v });
        filters.register(|_ctx: RequestContext, v: Value| async move { Ok::<_, anyhow::Error>(v) });
        assert_eq!(filters.len(), 2);

        filters.reset();
        assert!(filters.is_empty());
    }

    #[test]
    #[should_panic(expected = "after the application was built")]
    fn frozen_lists_reject_registration() {
        let filters = Filters::new();
        let _ = filters.freeze();
        filters.register(|_ctx: RequestContext, v: Value| async move { v });
    }
}
