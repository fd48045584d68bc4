//! Application options.
//!
//! Built in code through [`App::builder`](crate::App::builder), or seeded from
//! the environment:
//!
//! | variable            | effect                                                  |
//! |---------------------|---------------------------------------------------------|
//! | `DOTROUTE_ENV`      | `development` / `dev` turns on error detail in 500s     |
//! | `DOTROUTE_HTTP_LOG` | `true` / `1` turns on the access log                    |
//! | `DOTROUTE_CORS`     | `off`, `*`, or a comma-separated origin allow-list      |

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::event::OnRequestComplete;
use crate::middleware::Middleware;
use crate::middleware::cors::{AllowOrigin, Cors, CorsPolicy};
use crate::plugin::Plugin;
use crate::request::Request;
use crate::response::Response;

/// Observer of unexpected failures. Fire and forget: its outcome is ignored.
pub type OnException = Arc<dyn Fn(&anyhow::Error, &Request) + Send + Sync>;

/// Runs on the raw request after the base middlewares and before routing.
/// Returning a response answers the request there and then.
pub type BeforeRoutes = Arc<dyn Fn(&mut http::Request<Bytes>) -> Option<Response> + Send + Sync>;

/// Sees every unexpected failure after routing, ahead of the global error
/// handler.
pub type AfterRoutes = Arc<dyn Fn(&anyhow::Error, &Request) + Send + Sync>;

#[derive(Clone, Default)]
pub struct AppOptions {
    /// Attach `errorMessage` and `stack` to 500 envelopes.
    pub is_dev: bool,
    pub enable_http_logging: bool,
    pub cors: Cors,
    /// Run ahead of every route's own middlewares.
    pub middlewares: Vec<Middleware>,
    pub on_exception: Option<OnException>,
    pub on_request_complete: Option<OnRequestComplete>,
    pub before_routes: Vec<BeforeRoutes>,
    pub after_routes: Vec<AfterRoutes>,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl AppOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(env) = lookup("DOTROUTE_ENV") {
            options.is_dev = matches!(env.trim().to_ascii_lowercase().as_str(), "development" | "dev");
        }
        if let Some(v) = lookup("DOTROUTE_HTTP_LOG") {
            options.enable_http_logging = parse_flag(&v).unwrap_or(options.enable_http_logging);
        }
        if let Some(v) = lookup("DOTROUTE_CORS") {
            options.cors = parse_cors(&v);
        }
        options
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim() {
        "1" => Some(true),
        "0" => Some(false),
        other => other.to_ascii_lowercase().parse().ok(),
    }
}

fn parse_cors(v: &str) -> Cors {
    let v = v.trim();
    if v.eq_ignore_ascii_case("off") || v.eq_ignore_ascii_case("false") {
        return Cors::Disabled;
    }
    let origins: Vec<String> = v
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect();

    let origin = match origins.as_slice() {
        [] => None,
        [only] if only == "*" => Some(AllowOrigin::Any),
        [only] => Some(AllowOrigin::Exact(only.clone())),
        _ => Some(AllowOrigin::List(origins)),
    };
    Cors::Policy(CorsPolicy { origin, ..CorsPolicy::default() })
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("is_dev", &self.is_dev)
            .field("enable_http_logging", &self.enable_http_logging)
            .field("cors", &self.cors)
            .field("middlewares", &self.middlewares.len())
            .field("on_exception", &self.on_exception.is_some())
            .field("on_request_complete", &self.on_request_complete.is_some())
            .field("before_routes", &self.before_routes.len())
            .field("after_routes", &self.after_routes.len())
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
