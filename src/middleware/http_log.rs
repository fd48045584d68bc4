//! Access log: one line per request on the `dotroute::http` target.

use std::time::Duration;

use http::StatusCode;

pub(crate) const TARGET: &str = "dotroute::http";

/// Emits the access-log line for a finished request.
pub(crate) fn record(method: &http::Method, path: &str, status: StatusCode, elapsed: Duration, body_len: u64) {
    tracing::info!(
        target: TARGET,
        %method,
        path,
        status = status.as_u16(),
        latency_ms = elapsed.as_secs_f64() * 1000.0,
        bytes = body_len,
        "{method} {path} {} {:.3} ms - {body_len}",
        status.as_u16(),
        elapsed.as_secs_f64() * 1000.0,
    );
}
