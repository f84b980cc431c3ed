//! Anthropic Messages API client used by the chat relay.

use crate::api::models::{ChatMessage, ChatRequest};
use crate::core::config::AnthropicConfig;
use crate::core::{AppError, Result};
use crate::services::upstream::{
    observe_latency, payload_error, read_error_body, status_error, transport_error,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

pub const PROVIDER_NAME: &str = "anthropic";

/// Outbound body. Only these three fields are ever sent.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

impl<'a> From<&'a ChatRequest> for MessagesRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
        }
    }
}

/// Handle to the Anthropic Messages API, built once at startup.
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    version: String,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, config: &AnthropicConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            version: config.version.clone(),
        }
    }

    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }

    /// Send the conversation and return the provider's message object as-is.
    pub async fn create_message(&self, request: &ChatRequest) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AppError::MissingCredential("ANTHROPIC_API_KEY"))?;
        let url = self.messages_url();

        tracing::debug!(
            provider = PROVIDER_NAME,
            model = %request.model,
            max_tokens = request.max_tokens,
            messages = request.messages.len(),
            "Forwarding chat request"
        );

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.version)
            .json(&MessagesRequest::from(request))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER_NAME, &url, e))?;
        observe_latency(PROVIDER_NAME, start);

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(PROVIDER_NAME, response).await;
            return Err(status_error(PROVIDER_NAME, status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| payload_error(PROVIDER_NAME, format!("invalid JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_request_shape() {
        let request = ChatRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 256,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hi".to_string(),
            }],
        };

        assert_eq!(
            serde_json::to_value(MessagesRequest::from(&request)).unwrap(),
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 256,
                "messages": [{"role": "user", "content": "Hi"}]
            })
        );
    }

    #[test]
    fn test_messages_url_trims_trailing_slash() {
        let config = AnthropicConfig {
            api_base: "http://localhost:9000/".to_string(),
            ..AnthropicConfig::default()
        };
        let client = AnthropicClient::new(reqwest::Client::new(), &config);
        assert_eq!(client.messages_url(), "http://localhost:9000/v1/messages");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = AnthropicClient::new(reqwest::Client::new(), &AnthropicConfig::default());
        let request = ChatRequest {
            model: "m".to_string(),
            max_tokens: 1,
            messages: vec![],
        };

        let err = client.create_message(&request).await.unwrap_err();
        assert!(matches!(err, AppError::MissingCredential("ANTHROPIC_API_KEY")));
    }
}
