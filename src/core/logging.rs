//! Request-scoped logging context.
//!
//! The request id lives in a tokio task-local so relay log lines can carry it
//! without threading it through every call.

use axum::http::HeaderMap;

/// Header used to accept and echo request ids.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound request id that is accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reuse the caller's `x-request-id` when it is printable and short,
/// otherwise mint a new one.
pub fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .filter(|id| id.chars().all(|c| c.is_ascii_graphic()))
        .map(str::to_string)
        .unwrap_or_else(generate_request_id)
}
