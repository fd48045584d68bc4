//! The request-completion event handed to `on_request_complete`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Emitted once per routed request, after the response has been produced.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequestEvent {
    pub request_id: String,
    /// ISO-8601 with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`.
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub body: Value,
    pub query: Value,
    pub status_code: u16,
    pub duration_ms: u64,
}

impl CompleteRequestEvent {
    pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Observer of completion events. Fire and forget: its outcome is ignored.
pub type OnRequestComplete = Arc<dyn Fn(&CompleteRequestEvent) + Send + Sync>;
