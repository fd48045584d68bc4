//! Infrastructure error type.

/// The error type returned by dotroute's fallible setup and serving operations.
///
/// Application-level failures (400, 404, etc.) are expressed as
/// [`HttpError`](crate::HttpError) values travelling through the request
/// pipeline, not as `Error`s. This type surfaces assembly and transport
/// failures: an unparsable route pattern, a bad bind address, socket I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid route `{path}`: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),
}
