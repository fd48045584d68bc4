//! Route methods as a typed enum.
//!
//! Only the verbs a route can be declared with. `HEAD` is served by the `GET`
//! route and `OPTIONS` before routing; anything else arriving on the wire
//! (TRACE, WebDAV verbs) never matches a route and falls through to the 404
//! envelope.

use std::fmt;
use std::str::FromStr;

/// A method a route can be registered for. Defaults to [`Method::Get`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    #[default]
    Get,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Patch  => "PATCH",
            Self::Post   => "POST",
            Self::Put    => "PUT",
        }
    }

    /// Maps a wire method onto a route method, if it is one. Wire methods
    /// are case-sensitive: an extension method spelled `get` is not `GET`.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        Self::ALL.into_iter().find(|m| http::Method::from(*m) == *method)
    }

    pub(crate) const ALL: [Self; 5] =
        [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];
}

/// Parses a method name. Case-insensitive, so `"get"` and `"GET"` both work.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Ok(Self::Delete),
            "GET"    => Ok(Self::Get),
            "PATCH"  => Ok(Self::Patch),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            _        => Err(UnknownMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Delete => http::Method::DELETE,
            Method::Get    => http::Method::GET,
            Method::Patch  => http::Method::PATCH,
            Method::Post   => http::Method::POST,
            Method::Put    => http::Method::PUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported route method `{0}`")]
pub struct UnknownMethod(String);
