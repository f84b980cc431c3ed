//! Shared failure handling for provider calls.
//!
//! Every provider client reports failures through these helpers so logging,
//! metrics and the resulting [`AppError`] look the same for both relays.

use crate::core::error_types::ProviderErrorKind;
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::core::AppError;
use serde_json::Value;
use std::error::Error;
use std::time::Instant;

const MAX_ERROR_MESSAGE_LEN: usize = 500;

fn record_error(provider: &str, kind: ProviderErrorKind) {
    get_metrics()
        .provider_errors
        .with_label_values(&[provider, kind.as_str()])
        .inc();
}

/// Observe how long a provider took to answer.
pub fn observe_latency(provider: &str, start: Instant) {
    get_metrics()
        .provider_latency
        .with_label_values(&[provider])
        .observe(start.elapsed().as_secs_f64());
}

/// The request never produced a response (connect, timeout, TLS...).
pub fn transport_error(provider: &'static str, url: &str, err: reqwest::Error) -> AppError {
    let kind = ProviderErrorKind::from_reqwest(&err);
    record_error(provider, kind);
    tracing::error!(
        request_id = %get_request_id(),
        provider = provider,
        url = %url,
        error = %err,
        error_source = ?err.source(),
        is_timeout = err.is_timeout(),
        is_connect = err.is_connect(),
        "HTTP request failed to provider"
    );
    AppError::Request(err)
}

/// The provider answered with a non-2xx status.
pub fn status_error(provider: &'static str, status: reqwest::StatusCode, body: &str) -> AppError {
    record_error(provider, ProviderErrorKind::Status);
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| extract_error_message(&v))
        .unwrap_or_else(|| body.to_string());
    let message = if message.trim().is_empty() {
        format!("provider returned {}", status)
    } else {
        truncate_message(&message)
    };
    tracing::error!(
        request_id = %get_request_id(),
        provider = provider,
        status = status.as_u16(),
        message = %message,
        "Provider returned error status"
    );
    AppError::Upstream {
        provider,
        status: Some(status.as_u16()),
        message,
    }
}

/// The provider answered 2xx but the payload cannot be used.
pub fn payload_error(provider: &'static str, message: impl Into<String>) -> AppError {
    record_error(provider, ProviderErrorKind::Payload);
    let message = message.into();
    tracing::error!(
        request_id = %get_request_id(),
        provider = provider,
        message = %message,
        "Provider returned unusable payload"
    );
    AppError::Upstream {
        provider,
        status: None,
        message,
    }
}

/// Read a non-2xx response body for error reporting.
///
/// A body that cannot be read yields an empty string so the status alone
/// is reported.
pub async fn read_error_body(provider: &'static str, response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(
                request_id = %get_request_id(),
                provider = provider,
                status = status.as_u16(),
                error = %err,
                "Failed to read provider error body"
            );
            String::new()
        }
    }
}

fn truncate_message(message: &str) -> String {
    let mut chars = message.chars();
    let truncated: String = chars.by_ref().take(MAX_ERROR_MESSAGE_LEN).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Extract canonical error message from provider error payload.
///
/// Anthropic and Google both nest it under `error.message`.
pub fn extract_error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.as_str())
                .map(|s| s.to_string())
        })
        .or_else(|| {
            body.get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_error_message_anthropic() {
        let body = json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        });
        assert_eq!(
            extract_error_message(&body).as_deref(),
            Some("invalid x-api-key")
        );
    }

    #[test]
    fn test_extract_error_message_google() {
        let body = json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        });
        assert_eq!(
            extract_error_message(&body).as_deref(),
            Some("API key not valid.")
        );
    }

    #[test]
    fn test_extract_error_message_fallbacks() {
        assert_eq!(
            extract_error_message(&json!({"error": "flat"})).as_deref(),
            Some("flat")
        );
        assert_eq!(
            extract_error_message(&json!({"message": "top"})).as_deref(),
            Some("top")
        );
        assert_eq!(extract_error_message(&json!({"other": 1})), None);
    }

    #[test]
    fn test_status_error_uses_provider_message() {
        let err = status_error(
            "anthropic",
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        );
        match err {
            AppError::Upstream {
                provider,
                status,
                message,
            } => {
                assert_eq!(provider, "anthropic");
                assert_eq!(status, Some(401));
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_error_empty_body() {
        let err = status_error("imagen", reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(
            err.to_string(),
            "Upstream error from imagen: provider returned 503 Service Unavailable"
        );
    }

    /// Serve one response whose body is shorter than its Content-Length.
    async fn serve_truncated_error() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
                )
                .await;
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_read_error_body_falls_back_to_empty() {
        let url = serve_truncated_error().await;
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_error_body("anthropic", response).await;
        assert_eq!(body, "");

        let err = status_error("anthropic", reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert_eq!(
            err.to_string(),
            "Upstream error from anthropic: provider returned 500 Internal Server Error"
        );
    }

    #[test]
    fn test_truncate_message_one_over() {
        let one_over: String = "x".repeat(MAX_ERROR_MESSAGE_LEN + 1);
        let result = truncate_message(&one_over);
        assert_eq!(result.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_message_unicode() {
        let unicode: String = "画".repeat(MAX_ERROR_MESSAGE_LEN + 10);
        let result = truncate_message(&unicode);
        assert_eq!(result.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }
}
