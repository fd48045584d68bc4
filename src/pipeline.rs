//! The per-route request pipeline.
//!
//! ```text
//! validate body/query/params ──400──▶ envelope
//!   │ validate uploads ─────────400──▶ envelope
//!   ▼
//! context ─▶ middlewares (global, group, route) ──HttpError──▶ envelope
//!   ▼
//! handler ─▶ HttpError? ─▶ envelope
//!   │        empty / never schema ─▶ 204
//!   ▼
//! response schema ─▶ filters ─▶ 200 JSON
//! ```
//!
//! Any `Err` (or panic, validators included) that is not an [`HttpError`]
//! leaves through the error boundary: after-route hooks, the exception
//! observer, then a 500 envelope.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use http::StatusCode;
use serde_json::{Value, json};
use tracing::Instrument;

use crate::config::{AfterRoutes, OnException};
use crate::context::RequestContext;
use crate::filter::{self, ResponseFilter};
use crate::handler::{BoxedHandler, Reply};
use crate::http_error::HttpError;
use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::schema::ValidationSchema;
use crate::upload::FileRules;
use crate::validation;

/// One mounted route with everything resolved at assembly.
pub(crate) struct Pipeline {
    pub(crate) handler: BoxedHandler,
    pub(crate) schema: ValidationSchema,
    /// Global middlewares followed by the route's own.
    pub(crate) middlewares: Vec<Middleware>,
    pub(crate) files: Option<FileRules>,
}

/// State every pipeline of one application shares.
pub(crate) struct Shared {
    pub(crate) filters: Vec<ResponseFilter>,
    pub(crate) is_dev: bool,
    pub(crate) on_exception: Option<OnException>,
    pub(crate) after_routes: Vec<AfterRoutes>,
}

/// What a routed request ended with.
pub(crate) struct Outcome {
    pub(crate) response: Response,
    pub(crate) body: Value,
    pub(crate) query: Value,
}

impl Pipeline {
    pub(crate) async fn run(&self, mut request: Request, request_id: &str, shared: &Shared) -> Outcome {
        let span = tracing::info_span!(
            "request",
            request_id,
            method = %request.method,
            path = request.path(),
        );

        let checked = std::panic::catch_unwind(AssertUnwindSafe(|| self.check(&mut request, &span)));
        let rejection = match checked {
            Ok(rejection) => rejection,
            Err(panic) => {
                let err = anyhow::anyhow!("validator panicked: {}", panic_message(panic.as_ref()));
                Some(span.in_scope(|| shared.fail(err, &request)))
            }
        };
        if let Some(response) = rejection {
            return Outcome { response, body: request.body, query: request.query };
        }

        let body = request.body.clone();
        let query = request.query.clone();
        let ctx = RequestContext::new(request, request_id.to_owned(), span.clone());

        let result = AssertUnwindSafe(self.stages(ctx.clone(), shared))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let mut response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => span.in_scope(|| shared.fail(err, ctx.req())),
            Err(panic) => {
                let err = anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref()));
                span.in_scope(|| shared.fail(err, ctx.req()))
            }
        };

        for (name, value) in ctx.take_response_headers().iter() {
            response.headers.insert(name.clone(), value.clone());
        }

        Outcome { response, body, query }
    }

    /// Inbound validation of body, query, params and uploads. `Some` is the
    /// rejection to answer with.
    fn check(&self, request: &mut Request, span: &tracing::Span) -> Option<Response> {
        if let Err(details) = validation::validate_request(&self.schema, request) {
            tracing::debug!(parent: span, "request rejected by validation");
            return Some(validation::validation_failed(&details));
        }
        let rules = self.files.as_ref()?;
        if let Err(response) = validation::validate_files(rules, request) {
            tracing::debug!(parent: span, "upload rejected");
            return Some(response);
        }
        None
    }

    async fn stages(&self, ctx: RequestContext, shared: &Shared) -> anyhow::Result<Response> {
        for middleware in &self.middlewares {
            if let Flow::Halt(err) = middleware.call(ctx.clone()).await? {
                tracing::debug!(code = err.code(), "middleware halted the request");
                return Ok(err.into_response());
            }
        }

        let value = match self.handler.call(ctx.clone()).await? {
            Reply::Error(err) => return Ok(err.into_response()),
            Reply::Empty => return Ok(Response::status(StatusCode::NO_CONTENT)),
            Reply::Value(value) => value,
        };

        let value = match &self.schema.response {
            Some(schema) if schema.is_never() => return Ok(Response::status(StatusCode::NO_CONTENT)),
            Some(schema) => validation::validate_response(schema.as_ref(), &value)?,
            None => value,
        };

        let value = filter::apply_all(&shared.filters, &ctx, value).await?;
        Ok(Response::json(&value))
    }
}

impl Shared {
    /// The error boundary. A thrown [`HttpError`] gets its own envelope;
    /// anything else is an unexpected failure answered with a 500.
    pub(crate) fn fail(&self, err: anyhow::Error, request: &Request) -> Response {
        let err = match err.downcast::<HttpError>() {
            Ok(http) => {
                tracing::debug!(code = http.code(), "request failed with a declared error");
                return http.into_response();
            }
            Err(err) => err,
        };

        for hook in &self.after_routes {
            hook(&err, request);
        }
        if let Some(observer) = &self.on_exception {
            observer(&err, request);
        }
        tracing::error!(error = %err, "unhandled error in request pipeline");

        internal_error(&err, self.is_dev)
    }
}

/// The uniform 500 envelope, with error detail in development.
pub(crate) fn internal_error(err: &anyhow::Error, is_dev: bool) -> Response {
    let mut body = json!({
        "status": 500,
        "code": "INTERNAL_ERROR",
        "message": "Internal Server Error",
    });
    if is_dev {
        body["data"] = json!({
            "errorMessage": err.to_string(),
            "stack": format!("{err:?}"),
        });
    }
    Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).json(&body)
}

/// The envelope for requests no route matched.
pub(crate) fn not_found() -> Response {
    Response::builder().status(StatusCode::NOT_FOUND).json(&json!({
        "status": 404,
        "code": "NOT_FOUND",
        "message": "No matching route.",
    }))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
