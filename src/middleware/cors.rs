//! Cross-origin resource sharing.
//!
//! A [`CorsPolicy`] is turned into a `tower_http` [`CorsLayer`] wrapped around
//! the route table. With a policy in place, preflight (`OPTIONS`) requests
//! are answered by the layer, re-statused `204 No Content`, and never reach
//! the route table.

use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use tower_http::cors::{self, CorsLayer};

/// CORS configuration of an application.
#[derive(Clone, Debug)]
pub enum Cors {
    /// No CORS headers; `OPTIONS` gets a plain `200` with an `Allow` header.
    Disabled,
    Policy(CorsPolicy),
}

impl Default for Cors {
    fn default() -> Self {
        Self::Policy(CorsPolicy::default())
    }
}

/// Which origins may read responses.
#[derive(Clone, Debug, PartialEq)]
pub enum AllowOrigin {
    /// `*`, or the caller's origin echoed back when credentials are allowed.
    Any,
    Exact(String),
    /// The caller's origin is echoed back when listed.
    List(Vec<String>),
}

#[derive(Clone, Debug)]
pub struct CorsPolicy {
    pub origin: Option<AllowOrigin>,
    pub methods: Vec<http::Method>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
    pub max_age: Option<Duration>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            origin: None,
            methods: vec![
                http::Method::GET,
                http::Method::POST,
                http::Method::PUT,
                http::Method::DELETE,
                http::Method::OPTIONS,
            ],
            allowed_headers: vec!["Content-Type".to_owned(), "Authorization".to_owned()],
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: None,
        }
    }
}

impl CorsPolicy {
    pub fn origin(mut self, origin: AllowOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = http::Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn exposed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exposed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn credentials(mut self, allow: bool) -> Self {
        self.credentials = allow;
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    /// The `tower-http` layer enforcing this policy.
    ///
    /// Header names and origins that are not valid header values are skipped.
    pub(crate) fn layer(&self) -> CorsLayer {
        let mut layer = CorsLayer::new()
            .allow_methods(self.methods.clone())
            .allow_headers(header_names(&self.allowed_headers))
            .expose_headers(header_names(&self.exposed_headers))
            .allow_credentials(self.credentials);

        layer = match &self.origin {
            None => layer,
            Some(AllowOrigin::Any) => layer.allow_origin(self.any_origin()),
            Some(AllowOrigin::Exact(origin)) if origin == "*" => layer.allow_origin(self.any_origin()),
            Some(AllowOrigin::Exact(origin)) => match HeaderValue::from_str(origin) {
                Ok(origin) => layer.allow_origin(cors::AllowOrigin::exact(origin)),
                Err(_) => layer,
            },
            Some(AllowOrigin::List(list)) => layer.allow_origin(cors::AllowOrigin::list(
                list.iter().filter(|o| *o != "*").filter_map(|o| HeaderValue::from_str(o).ok()),
            )),
        };

        match self.max_age {
            Some(age) => layer.max_age(age),
            None => layer,
        }
    }

    /// Browsers reject a credentialed `*`, so with credentials the caller's
    /// origin is mirrored instead.
    fn any_origin(&self) -> cors::AllowOrigin {
        if self.credentials { cors::AllowOrigin::mirror_request() } else { cors::AllowOrigin::any() }
    }
}

fn header_names(names: &[String]) -> Vec<HeaderName> {
    names.iter().filter_map(|name| name.parse().ok()).collect()
}
