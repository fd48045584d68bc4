//! Pluggable validators.
//!
//! The pipeline only knows one contract: a [`Schema`] turns a JSON value into
//! either a parsed (possibly coerced) value or a list of [`Issue`]s. Any
//! engine can sit behind it; a closure is enough:
//!
//! ```rust
//! use dotroute::schema::{Issue, Schema};
//! use serde_json::{Value, json};
//!
//! let even = |v: &Value| match v.as_i64() {
//!     Some(n) if n % 2 == 0 => Ok(v.clone()),
//!     _ => Err(vec![Issue::custom("not an even number")]),
//! };
//! assert!(even.validate(&json!(4)).is_ok());
//! ```
//!
//! The built-in combinators in [`types`] cover the common shapes and report
//! issues in the same structured form (`code`, `path`, `message`,
//! `expected`/`received`).

pub mod types;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use types::{TypeSchema, any, array, boolean, never, number, object, string};

/// A validator for one part of a request or response.
pub trait Schema: Send + Sync + 'static {
    /// Parses `value`, returning the value the handler should see or every
    /// issue found.
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>>;

    /// `true` for a schema no value satisfies. As a response schema it marks
    /// the route as answering `204 No Content`.
    fn is_never(&self) -> bool {
        false
    }
}

impl<F> Schema for F
where
    F: Fn(&Value) -> Result<Value, Vec<Issue>> + Send + Sync + 'static,
{
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        self(value)
    }
}

/// One structured validation problem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    pub path: Vec<Value>,
    pub message: String,
}

impl Issue {
    /// A free-form issue with code `custom` at the root path.
    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            code: "custom".to_owned(),
            expected: None,
            received: None,
            path: Vec::new(),
            message: message.into(),
        }
    }

    pub fn at(mut self, path: Vec<Value>) -> Self {
        self.path = path;
        self
    }
}

/// How a route's path parameters are checked.
#[derive(Clone)]
pub enum ParamsSchema {
    /// Parsed like body and query.
    Schema(Arc<dyn Schema>),
    /// Presence check only: each key must exist.
    Keys(Vec<String>),
}

/// The validators declared for one route.
///
/// Produced by the route's schema factory, which runs once when the
/// application is assembled.
#[derive(Clone, Default)]
pub struct ValidationSchema {
    pub(crate) body: Option<Arc<dyn Schema>>,
    pub(crate) query: Option<Arc<dyn Schema>>,
    pub(crate) params: Option<ParamsSchema>,
    pub(crate) response: Option<Arc<dyn Schema>>,
}

impl ValidationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, schema: impl Schema) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    pub fn query(mut self, schema: impl Schema) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    pub fn params(mut self, schema: impl Schema) -> Self {
        self.params = Some(ParamsSchema::Schema(Arc::new(schema)));
        self
    }

    /// Requires the named path parameters to be present, without parsing them.
    pub fn param_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = Some(ParamsSchema::Keys(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Shape the handler's result must satisfy. A [`never`] schema turns the
    /// route into a `204 No Content` endpoint.
    pub fn response(mut self, schema: impl Schema) -> Self {
        self.response = Some(Arc::new(schema));
        self
    }
}
